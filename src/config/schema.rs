use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "probes": {
                "type": "object",
                "properties": {
                    "timeout_secs": { "type": "integer", "minimum": 1 },
                    "concurrency": { "type": "integer", "minimum": 1 },
                    "public_resolver": { "type": "string" },
                    "blacklist_servers": { "type": "array", "items": { "type": "string" } },
                    "common_subdomains": { "type": "array", "items": { "type": "string" } },
                    "trusted_email_providers": {
                        "type": "object",
                        "additionalProperties": { "type": "string" }
                    },
                    "geoip_url": { "type": "string" },
                    "ct_log_url": { "type": "string" },
                    "whois_referral_server": { "type": "string" },
                    "user_agent": { "type": "string" }
                }
            },
            "scoring": {
                "type": "object",
                "properties": {
                    "points": {
                        "type": "object",
                        "additionalProperties": { "type": "integer", "minimum": 0 }
                    },
                    "new_domain_days": { "type": "integer", "minimum": 0 },
                    "slow_dns_ms": { "type": "number", "minimum": 0 },
                    "unsafe_high_count": { "type": "integer", "minimum": 1 },
                    "max_safe_medium": { "type": "integer", "minimum": 0 },
                    "min_safe_score": { "type": "integer", "minimum": 0, "maximum": 100 }
                }
            },
            "reputation": {
                "type": "object",
                "properties": {
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string", "format": "uri" },
                    "poll_interval_secs": { "type": "integer", "minimum": 1 },
                    "max_polls": { "type": "integer", "minimum": 1 },
                    "request_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "fusion": {
                "type": "object",
                "properties": {
                    "policy": { "type": "string", "enum": ["fail_closed", "reputation_first"] }
                }
            },
            "session": {
                "type": "object",
                "properties": {
                    "max_attempts": { "type": "integer", "minimum": 1 },
                    "retry_backoff_secs": { "type": "integer", "minimum": 0 },
                    "deadline_secs": { "type": "integer", "minimum": 1 },
                    "persist_retries": { "type": "integer", "minimum": 0 }
                }
            },
            "storage": {
                "type": "object",
                "properties": {
                    "database": { "type": "string" },
                    "in_memory": { "type": "boolean" }
                }
            },
            "summarizer": {
                "type": "object",
                "properties": {
                    "provider": { "type": "string", "enum": ["gemini"] },
                    "api_key": { "type": "string" },
                    "model": { "type": "string" },
                    "max_output_tokens": { "type": "integer", "minimum": 1 }
                }
            },
            "blocker": {
                "type": "object",
                "properties": {
                    "hosts_file": { "type": "string" },
                    "redirect_ip": { "type": "string" }
                }
            }
        }
    })
});
