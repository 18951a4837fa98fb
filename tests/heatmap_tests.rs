use qcscope::heatmap::{bucket, Intensity};

#[test]
fn thresholds() {
    assert_eq!(bucket(0), Intensity::None);
    assert_eq!(bucket(1), Intensity::Low);
    assert_eq!(bucket(5), Intensity::Low);
    assert_eq!(bucket(6), Intensity::Medium);
    assert_eq!(bucket(10), Intensity::Medium);
    assert_eq!(bucket(11), Intensity::High);
    assert_eq!(bucket(20), Intensity::High);
    assert_eq!(bucket(21), Intensity::Critical);
    assert_eq!(bucket(10_000), Intensity::Critical);
}

#[test]
fn buckets_are_monotonic() {
    let mut prev = bucket(0);
    for n in 1..50 {
        let b = bucket(n);
        assert!(b >= prev, "bucket({n}) went down");
        prev = b;
    }
}

#[test]
fn colors() {
    assert_eq!(Intensity::None.color(), "green");
    assert_eq!(Intensity::Critical.color(), "critical");
}
