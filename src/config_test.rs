use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

fn minimal() -> Vec<(&'static str, &'static str)> {
    vec![("DATABASE_URL", "postgres://localhost/workshops"), ("JWT_SECRET", "s3cret")]
}

#[test]
fn from_lookup_applies_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(&minimal())).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.app_name, DEFAULT_APP_NAME);
    assert!(!cfg.debug);
    assert!(cfg.cookie_secure);
    assert_eq!(cfg.jwt.audience, "authenticated");
    assert_eq!(cfg.jwt.ttl, Duration::from_secs(DEFAULT_JWT_TTL_SECS));
    assert!(cfg.email.api_key.is_none());
    assert!(cfg.moderation.enabled);
    assert!(cfg.moderation.spam_detection);
    assert_eq!(cfg.moderation.max_review_length, 1000);
    assert_eq!(cfg.reminder_interval, Some(Duration::from_secs(300)));
    assert_eq!(cfg.reminder_send_concurrency, 4);
}

#[test]
fn cookie_secure_follows_debug_unless_set() {
    let mut pairs = minimal();
    pairs.push(("DEBUG", "true"));
    assert!(!AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);

    pairs.push(("COOKIE_SECURE", "yes"));
    assert!(AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);

    let mut pairs = minimal();
    pairs.push(("COOKIE_SECURE", "false"));
    assert!(!AppConfig::from_lookup(lookup_from(&pairs)).unwrap().cookie_secure);
}

#[test]
fn from_lookup_requires_database_url() {
    let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
}

#[test]
fn from_lookup_rejects_blank_secret() {
    let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "   ")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
}

#[test]
fn from_lookup_falls_back_to_secret_key() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x"), ("SECRET_KEY", "legacy")])).unwrap();
    assert_eq!(cfg.jwt.secret, "legacy");
}

#[test]
fn from_lookup_reports_invalid_port() {
    let mut pairs = minimal();
    pairs.push(("PORT", "eighty"));
    let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
    assert_eq!(err.to_string(), "invalid value for PORT: eighty");
}

#[test]
fn zero_reminder_interval_disables_sweep() {
    let mut pairs = minimal();
    pairs.push(("REMINDER_INTERVAL_SECS", "0"));
    let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert!(cfg.reminder_interval.is_none());
}

#[test]
fn moderation_flags_and_words_parse() {
    let mut pairs = minimal();
    pairs.push(("ENABLE_CONTENT_MODERATION", "off"));
    pairs.push(("ENABLE_SPAM_DETECTION", "No"));
    pairs.push(("BAD_WORDS", " Foo, ,BAR ,baz"));
    let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert!(!cfg.moderation.enabled);
    assert!(!cfg.moderation.spam_detection);
    assert_eq!(cfg.moderation.bad_words, vec!["foo", "bar", "baz"]);
}

#[test]
fn parse_word_list_handles_empty_input() {
    assert!(parse_word_list("").is_empty());
    assert!(parse_word_list(" , ,").is_empty());
}

// =============================================================================
// env helpers: unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_and_false_variants() {
    for (i, (val, expected)) in [("1", true), ("yes", true), ("On", true), ("0", false), ("FALSE", false), ("off", false)]
        .iter()
        .enumerate()
    {
        let key = format!("__TEST_CFG_EB_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(*expected), "value {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_returns_none() {
    let key = "__TEST_CFG_EB_INVALID_5521__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__TEST_CFG_EP_GARBAGE_3310__";
    unsafe { std::env::set_var(key, "not-a-number") };
    assert_eq!(env_parse(key, 42_u64), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_reads_value() {
    let key = "__TEST_CFG_EP_VALUE_3311__";
    unsafe { std::env::set_var(key, "17") };
    assert_eq!(env_parse(key, 0_usize), 17);
    unsafe { std::env::remove_var(key) };
}
