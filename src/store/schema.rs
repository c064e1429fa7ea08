pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS verdicts (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    overall TEXT NOT NULL,
    verdict_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blocked (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    user_id TEXT,
    verdict_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_verdicts_overall ON verdicts(overall);
CREATE INDEX IF NOT EXISTS idx_blocked_domain ON blocked(domain);
";
