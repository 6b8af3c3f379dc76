use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use streamsketch::countmin::CmsConfig;
use streamsketch::countmin::CmsType;
use streamsketch::countmin::CountMinSketch;
use streamsketch::heavyhitters::HeavyHitters;
use streamsketch::heavyhitters::HhConfig;
use streamsketch::hll::HllConfig;
use streamsketch::hll::HyperLogLog;
use streamsketch::ErrorKind;

#[test]
fn test_hll_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut sketch = HyperLogLog::new(HllConfig::new(10).with_seed(77)).unwrap();
    for _ in 0..5000 {
        sketch.add(&rng.random::<[u8; 16]>());
    }
    sketch.update_records(3);

    let bytes = sketch.to_bytes();
    let decoded = HyperLogLog::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.config(), sketch.config());
    assert_eq!(decoded.registers(), sketch.registers());
    assert_eq!(decoded.n_added(), sketch.n_added());
    assert_eq!(decoded.n_records(), 3);
    assert_eq!(decoded.query(), sketch.query());
    // Re-serialization is byte-identical
    assert_eq!(decoded.to_bytes(), bytes);
}

#[test]
fn test_cms_round_trip_all_variants() {
    for cms_type in [CmsType::Linear, CmsType::Log8, CmsType::Log16] {
        let config = CmsConfig::new(cms_type, 512).with_depth(4).with_seed(5);
        let mut sketch = CountMinSketch::new(config).unwrap();
        for i in 0..2000u32 {
            sketch.add(&(i % 100).to_le_bytes());
        }
        sketch.add_record();

        let bytes = sketch.to_bytes();
        let decoded = CountMinSketch::from_bytes(cms_type, &bytes).unwrap();

        assert_eq!(decoded.config(), sketch.config());
        assert_eq!(decoded.n_added(), sketch.n_added());
        assert_eq!(decoded.n_records(), 1);
        assert_eq!(decoded.saturated(), sketch.saturated());
        for i in 0..100u32 {
            assert_eq!(decoded.query(&i.to_le_bytes()), sketch.query(&i.to_le_bytes()));
        }
        assert_eq!(decoded.to_bytes(), bytes, "{cms_type:?} bytes changed");
    }
}

#[test]
fn test_hh_round_trip() {
    let mut sketch =
        HeavyHitters::new(HhConfig::new(64).with_max_key_len(8).with_seed(2)).unwrap();
    for i in 0..500u32 {
        sketch.add_count(format!("k{}", i % 20).as_bytes(), u64::from(i % 7) + 1);
    }

    let bytes = sketch.to_bytes();
    let decoded = HeavyHitters::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.config(), sketch.config());
    assert_eq!(decoded.n_added(), sketch.n_added());
    assert_eq!(decoded.query(10, 0), sketch.query(10, 0));
    assert_eq!(decoded.to_bytes(), bytes);
}

#[test]
fn test_save_load_files() {
    let dir = tempfile::tempdir().unwrap();

    let mut hll = HyperLogLog::new(HllConfig::new(12)).unwrap();
    hll.add(b"persisted");
    let path = dir.path().join("sketch.hll");
    hll.save(&path).unwrap();
    let loaded = HyperLogLog::load(&path).unwrap();
    assert_eq!(loaded.registers(), hll.registers());

    let mut cms = CountMinSketch::log8(256).unwrap();
    cms.add_count(b"persisted", 40);
    let path = dir.path().join("sketch.cms");
    cms.save(&path).unwrap();
    let loaded = CountMinSketch::load(CmsType::Log8, &path).unwrap();
    assert_eq!(loaded.query(b"persisted"), cms.query(b"persisted"));

    let mut hh = HeavyHitters::new(HhConfig::new(32)).unwrap();
    hh.add(b"persisted");
    let path = dir.path().join("sketch.hh");
    hh.save(&path).unwrap();
    let loaded = HeavyHitters::load(&path).unwrap();
    assert_eq!(loaded.query(1, 0), hh.query(1, 0));
}

#[test]
fn test_load_missing_file() {
    let err = HyperLogLog::load("/nonexistent/sketch.hll").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_bad_magic() {
    let mut bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    bytes[0] = b'X';
    let err = HyperLogLog::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_unsupported_version() {
    let mut bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    bytes[4] = 99;
    let err = HyperLogLog::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_wrong_kind() {
    let cms_bytes = CountMinSketch::linear(16).unwrap().to_bytes();
    let err = HyperLogLog::from_bytes(&cms_bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    let hll_bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    let err = CountMinSketch::from_bytes(CmsType::Linear, &hll_bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    // A log8 file does not load as log16
    let log8_bytes = CountMinSketch::log8(16).unwrap().to_bytes();
    let err = CountMinSketch::from_bytes(CmsType::Log16, &log8_bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_truncated_data() {
    let bytes = CountMinSketch::linear(64).unwrap().to_bytes();
    let err = CountMinSketch::from_bytes(CmsType::Linear, &bytes[..bytes.len() - 5]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    let err = CountMinSketch::from_bytes(CmsType::Linear, &bytes[..10]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_trailing_garbage_rejected() {
    let mut bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    bytes.push(0);
    let err = HyperLogLog::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_invalid_stored_register() {
    let mut bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    // Corrupt one register past the maximum rank for p=10
    let len = bytes.len();
    bytes[len - 1] = 70;
    let err = HyperLogLog::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn test_invalid_stored_config() {
    // A valid container with an out-of-range precision must not construct
    let mut bytes = HyperLogLog::new(HllConfig::new(10)).unwrap().to_bytes();
    bytes[8] = 30;
    let err = HyperLogLog::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}
