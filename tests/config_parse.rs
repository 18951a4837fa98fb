use qcscope::assembler::Pipeline;
use qcscope::config::Config;
use qcscope::parser::DescriptorMode;

#[test]
fn parse_example_config() {
    let raw = include_str!("../qcscope.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.aggregation.rolling_days, 14);
    assert_eq!(cfg.classifier.keywords[0].keyword, "goal");
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let cfg: Config = toml::from_str(
        r#"
        [parser]
        descriptor = "leading-tokens"

        [attribution]
        unassigned_label = "Nobody"
        "#,
    )
    .expect("parse TOML");
    assert_eq!(cfg.parser.descriptor, DescriptorMode::LeadingTokens);
    assert_eq!(cfg.parser.leading_tokens, 3);
    assert_eq!(cfg.classifier.fallback, "Other");
    assert_eq!(cfg.logging.level, "info");

    let p = Pipeline::from_config(&cfg);
    assert_eq!(p.unassigned_label, "Nobody");
    assert_eq!(p.record("09:00:00 Goal line clearance missed", 1).descriptor, "Goal line clearance");
}

#[test]
fn custom_keyword_table_replaces_default() {
    let cfg: Config = toml::from_str(
        r#"
        [classifier]
        fallback = "Misc"
        keywords = [
          { keyword = "dunk", label = "Dunk" },
          { keyword = "foul", label = "Foul" },
        ]
        "#,
    )
    .expect("parse TOML");
    let p = Pipeline::from_config(&cfg);
    assert_eq!(p.record("10:00:00 Dunk after foul", 1).category, "Dunk");
    assert_eq!(p.record("10:00:00 Goal", 1).category, "Misc");
}

#[test]
fn load_reports_missing_file() {
    let err = Config::load(std::path::Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(format!("{err:#}").contains("reading config"));
}

#[test]
fn load_rejects_rolling_window_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qcscope.toml");
    std::fs::write(&path, "[aggregation]\nrolling_days = 4294967295\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("rolling_days"));

    std::fs::write(&path, "[aggregation]\nrolling_days = 30\n").unwrap();
    assert_eq!(Config::load(&path).unwrap().aggregation.rolling_days, 30);
    assert!(Config::default().validate().is_ok());
}
