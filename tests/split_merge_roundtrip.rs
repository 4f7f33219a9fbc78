use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use oorandom::Rand64;

use partfile::hash::{sha256_hex, EMPTY_SHA256_HEX};
use partfile::{merge_index, read_index, split_file, MergeOptions, PartConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pftest-rt-{prefix}-{pid}-{t}-{id}"))
}

fn cfg_for(root: &Path) -> PartConfig {
    PartConfig::default().with_store_dir(root.join("parts"))
}

/// Split, remove the source, merge back from the index, return the merged bytes.
fn roundtrip(root: &Path, data: &[u8], n: u64) -> Result<Vec<u8>> {
    let src = root.join("source.bin");
    fs::write(&src, data)?;
    let cfg = cfg_for(root);

    let report = split_file(&src, n, &cfg)?;
    fs::remove_file(&src)?;

    let merged = merge_index(&report.index_path, &MergeOptions::default(), &cfg)?;
    assert_eq!(merged.output, src, "merge must write to the recorded path");
    assert_eq!(merged.bytes, data.len() as u64);
    Ok(fs::read(&src)?)
}

#[test]
fn nine_bytes_into_two_parts() -> Result<()> {
    let root = unique_root("abc");
    fs::create_dir_all(&root)?;
    let src = root.join("letters.txt");
    fs::write(&src, b"abcdefghi")?;
    let cfg = cfg_for(&root);

    let report = split_file(&src, 2, &cfg)?;
    assert_eq!(report.parts.len(), 2);
    assert_eq!(report.parts[0].bytes, 4);
    assert_eq!(report.parts[1].bytes, 5);
    assert_eq!(fs::read(&report.parts[0].path)?, b"abcd");
    assert_eq!(fs::read(&report.parts[1].path)?, b"efghi");
    assert_eq!(report.parts[0].hash, sha256_hex(b"abcd"));
    assert_eq!(
        report.parts[1].path,
        root.join("parts").join(format!("{}.part", sha256_hex(b"efghi")))
    );

    // Index lives in the store by default and records the path as given.
    assert_eq!(report.index_path, root.join("parts").join("index.txt"));
    let text = fs::read_to_string(&report.index_path)?;
    let first = text.lines().next().unwrap_or_default();
    assert_eq!(first, format!("FILENAME: {}", src.display()));
    assert!(text.contains(&format!("0, {}\n", sha256_hex(b"abcd"))));
    assert!(text.contains(&format!("1, {}\n", sha256_hex(b"efghi"))));

    fs::remove_file(&src)?;
    merge_index(&report.index_path, &MergeOptions::default(), &cfg)?;
    assert_eq!(fs::read(&src)?, b"abcdefghi");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn last_part_absorbs_remainder() -> Result<()> {
    let root = unique_root("rem");
    fs::create_dir_all(&root)?;
    let src = root.join("ten.bin");
    fs::write(&src, b"0123456789")?;

    let report = split_file(&src, 3, &cfg_for(&root))?;
    let sizes: Vec<u64> = report.parts.iter().map(|p| p.bytes).collect();
    assert_eq!(sizes, vec![3, 3, 4]);
    assert_eq!(fs::read(&report.parts[2].path)?, b"6789");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn more_parts_than_bytes_still_roundtrips() -> Result<()> {
    let root = unique_root("degenerate");
    fs::create_dir_all(&root)?;
    let src = root.join("tiny.bin");
    fs::write(&src, b"xyz")?;
    let cfg = cfg_for(&root);

    let report = split_file(&src, 5, &cfg)?;
    assert_eq!(report.parts.len(), 5);
    for p in &report.parts[..4] {
        assert_eq!(p.bytes, 0);
        assert_eq!(p.hash, EMPTY_SHA256_HEX, "empty parts share the fixed empty digest");
    }
    assert_eq!(report.parts[4].bytes, 3);
    assert_eq!(report.distinct_files(), 2);
    assert_eq!(fs::metadata(&report.parts[0].path)?.len(), 0);

    let index = read_index(&report.index_path)?;
    let ordinals: Vec<u64> = index.entries.iter().map(|e| e.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);

    fs::remove_file(&src)?;
    merge_index(&report.index_path, &MergeOptions::default(), &cfg)?;
    assert_eq!(fs::read(&src)?, b"xyz");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn empty_file_roundtrips() -> Result<()> {
    let root = unique_root("empty");
    fs::create_dir_all(&root)?;
    let got = roundtrip(&root, b"", 3)?;
    assert!(got.is_empty());
    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn random_files_roundtrip_for_many_part_counts() -> Result<()> {
    let mut rng = Rand64::new(0x5eed_0f_9a27);
    for case in 0..24u64 {
        let root = unique_root("random");
        fs::create_dir_all(&root)?;

        let len = rng.rand_range(0..20_000) as usize;
        let data: Vec<u8> = (0..len).map(|_| rng.rand_u64() as u8).collect();
        let n = 1 + rng.rand_range(0..40);

        let got = roundtrip(&root, &data, n)?;
        assert_eq!(got, data, "case {case}: len={len}, n={n}");

        let _ = fs::remove_dir_all(&root);
    }
    Ok(())
}

#[test]
fn index_has_exactly_n_contiguous_ordinals() -> Result<()> {
    let root = unique_root("ordinals");
    fs::create_dir_all(&root)?;
    let src = root.join("src.bin");
    fs::write(&src, vec![0x42u8; 1000])?;

    for n in [1u64, 2, 7, 64] {
        let report = split_file(&src, n, &cfg_for(&root))?;
        let index = read_index(&report.index_path)?;
        assert_eq!(index.len() as u64, n);
        assert!(index.ordinal_problems().is_empty());
        let mut ordinals: Vec<u64> = index.entries.iter().map(|e| e.ordinal).collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, (0..n).collect::<Vec<_>>());
    }

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn splitting_twice_is_deterministic() -> Result<()> {
    let root = unique_root("determinism");
    fs::create_dir_all(&root)?;
    let src = root.join("src.bin");
    let data: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 256) as u8).collect();
    fs::write(&src, &data)?;
    let cfg = cfg_for(&root);

    let a = split_file(&src, 4, &cfg)?;
    let files_after_first = fs::read_dir(root.join("parts"))?.count();
    let b = split_file(&src, 4, &cfg)?;
    let files_after_second = fs::read_dir(root.join("parts"))?.count();

    let ha: Vec<&str> = a.parts.iter().map(|p| p.hash.as_str()).collect();
    let hb: Vec<&str> = b.parts.iter().map(|p| p.hash.as_str()).collect();
    assert_eq!(ha, hb);
    assert_eq!(
        files_after_first, files_after_second,
        "re-splitting must overwrite part files, not duplicate them"
    );
    // 4 parts + index.txt, no leftover temp files
    assert_eq!(files_after_second, 5);

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn duplicate_content_shares_one_part_file() -> Result<()> {
    let root = unique_root("dup");
    fs::create_dir_all(&root)?;
    let src = root.join("dup.bin");
    fs::write(&src, b"abcabcabc")?;
    let cfg = cfg_for(&root);

    let report = split_file(&src, 3, &cfg)?;
    assert!(report.parts.iter().all(|p| p.hash == report.parts[0].hash));
    assert_eq!(report.distinct_files(), 1);

    fs::remove_file(&src)?;
    merge_index(&report.index_path, &MergeOptions::default(), &cfg)?;
    assert_eq!(fs::read(&src)?, b"abcabcabc");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn merge_overwrites_existing_target() -> Result<()> {
    let root = unique_root("overwrite");
    fs::create_dir_all(&root)?;
    let src = root.join("doc.txt");
    fs::write(&src, b"original contents")?;
    let cfg = cfg_for(&root);

    let report = split_file(&src, 3, &cfg)?;
    fs::write(&src, b"something much longer that must be truncated away")?;

    merge_index(&report.index_path, &MergeOptions::default(), &cfg)?;
    assert_eq!(fs::read(&src)?, b"original contents");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn custom_index_path_and_output_override() -> Result<()> {
    let root = unique_root("custom");
    fs::create_dir_all(&root)?;
    let src = root.join("in.bin");
    fs::write(&src, b"custom index path")?;
    let idx = root.join("meta").join("in.idx");
    let cfg = cfg_for(&root).with_index_path(Some(idx.clone()));

    let report = split_file(&src, 2, &cfg)?;
    assert_eq!(report.index_path, idx);
    assert!(idx.exists());

    let out = root.join("restored").join("copy.bin");
    let opts = MergeOptions::default().with_output(Some(out.clone()));
    let merged = merge_index(&idx, &opts, &cfg)?;
    assert_eq!(merged.output, out);
    assert_eq!(fs::read(&out)?, b"custom index path");
    assert_eq!(fs::read(&src)?, b"custom index path", "source must be untouched");

    let _ = fs::remove_dir_all(&root);
    Ok(())
}
