use testwire::config::Config;
use testwire::report::ConnectPolicy;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert!(config.reporter.spec.is_none());
    assert_eq!(config.connect.attempts, 10);
    assert_eq!(config.connect.backoff_ms, 200);
    assert_eq!(config.connect.policy(), ConnectPolicy::default());
    assert_eq!(config.run.parallel, "1");
}
