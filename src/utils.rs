#[cfg(feature = "serde")]
use crate::engine::Bar;

// [
//   { "date": "2024-06-27", "open": 174.12, "high": 175.8,
//     "low": 173.44, "close": 175.02, "volume": 8734201 },
//   ...
// ]

#[cfg(feature = "serde")]
/// Reads bars from `filepath` and returns them in file order.
pub fn get_bars_from_file(filepath: &std::path::Path) -> crate::errors::Result<Vec<Bar>> {
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Generates a random ID.
pub fn random_id() -> u32 {
    rand::random()
}

/// FNV-1a hash, stable across runs and platforms.
pub fn stable_hash(text: &str) -> u64 {
    text.bytes()
        .fold(0xcbf2_9ce4_8422_2325, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3))
}

#[cfg(test)]
#[test]
fn stable_hash_known_values() {
    assert_eq!(stable_hash(""), 0xcbf2_9ce4_8422_2325);
    assert_eq!(stable_hash("a"), 0xaf63_dc4c_8601_ec8c);
    assert_ne!(stable_hash("AAPL"), stable_hash("TSLA"));
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn read_bars_from_file() {
    let path = std::env::temp_dir().join(format!("quantflow-bars-{}.json", random_id()));
    let json = r#"[
        {"date": "2024-06-27", "open": 174.12, "high": 175.8, "low": 173.44, "close": 175.02, "volume": 8734201},
        {"date": "2024-06-28", "open": 175.02, "high": 176.1, "low": 174.5, "close": 175.9, "volume": 6120044}
    ]"#;
    std::fs::write(&path, json).unwrap();

    let bars = get_bars_from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[1].close(), 175.9);
    assert_eq!(bars[0].volume(), 8_734_201);
    assert_eq!(bars[0].date().to_string(), "2024-06-27");
}
