// tests/search_plan_config.rs
use oldtimecrank::config::EngineConfig;
use oldtimecrank::ingest::config::{load_plan_default, load_plan_from, SearchPlan};
use std::path::PathBuf;
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("plan.toml");
    fs::write(
        &p_toml,
        r#"
keywords = ["Gramophone", "victrola "]

[[regions]]
name = "Tampa"
base_url = "https://tampa.craigslist.org"
"#,
    )
    .unwrap();
    let t = load_plan_from(&p_toml).unwrap();
    assert_eq!(t.keywords, vec!["gramophone".to_string(), "victrola".to_string()]);
    assert_eq!(t.regions[0].name, "Tampa");

    let p_json = dir.path().join("plan.json");
    fs::write(
        &p_json,
        r#"{"regions":[{"name":" Keys ","base_url":"https://keys.craigslist.org/"}],"keywords":["phonograph"]}"#,
    )
    .unwrap();
    let j = load_plan_from(&p_json).unwrap();
    assert_eq!(j.regions[0].name, "Keys");
    assert_eq!(j.regions[0].base_url, "https://keys.craigslist.org");
    assert_eq!(j.partitions().len(), 1);
}

#[serial_test::serial]
#[test]
fn plan_default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("LEADS_SEARCH_PLAN_PATH");

    // 1) nothing on disk -> built-in plan
    assert_eq!(load_plan_default().unwrap(), SearchPlan::default_plan());

    // 2) ./config/search_plan.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("search_plan.toml"),
        "keywords = [\"victrola\"]\n[[regions]]\nname = \"Miami\"\nbase_url = \"https://miami.craigslist.org\"\n",
    )
    .unwrap();
    let from_file = load_plan_default().unwrap();
    assert_eq!(from_file.regions.len(), 1);

    // 3) env wins over the fallback
    let p_env = tmp.path().join("other.json");
    fs::write(
        &p_env,
        r#"{"regions":[{"name":"Ocala","base_url":"https://ocala.craigslist.org"}],"keywords":["horn"]}"#,
    )
    .unwrap();
    env::set_var("LEADS_SEARCH_PLAN_PATH", p_env.display().to_string());
    assert_eq!(load_plan_default().unwrap().regions[0].name, "Ocala");

    // 4) env pointing nowhere is an error, not a silent fallback
    env::set_var("LEADS_SEARCH_PLAN_PATH", tmp.path().join("missing.toml"));
    assert!(load_plan_default().is_err());
    env::remove_var("LEADS_SEARCH_PLAN_PATH");

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn engine_config_env_overrides_file() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    for k in [
        "LEADS_CONFIG_PATH",
        "LEADS_DATA_DIR",
        "LEADS_MAX_STORE_SIZE",
        "LEADS_CONCURRENCY",
        "LEADS_RUN_INTERVAL_SECS",
    ] {
        env::remove_var(k);
    }

    assert_eq!(EngineConfig::load_default().unwrap(), EngineConfig::default());

    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/engine.toml"),
        "data_dir = \"leads-out\"\nconcurrency = 64\nmax_store_size = 250\n",
    )
    .unwrap();
    let file_cfg = EngineConfig::load_default().unwrap();
    assert_eq!(file_cfg.data_dir, PathBuf::from("leads-out"));
    assert_eq!(file_cfg.concurrency, 16);
    assert_eq!(file_cfg.max_store_size, Some(250));

    env::set_var("LEADS_CONCURRENCY", "4");
    env::set_var("LEADS_MAX_STORE_SIZE", "not-a-number");
    let env_cfg = EngineConfig::load_default().unwrap();
    assert_eq!(env_cfg.concurrency, 4);
    assert_eq!(env_cfg.max_store_size, Some(250));
    env::remove_var("LEADS_CONCURRENCY");
    env::remove_var("LEADS_MAX_STORE_SIZE");

    env::set_current_dir(&old).unwrap();
}
