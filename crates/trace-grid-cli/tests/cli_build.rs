//! Integration tests for the CLI binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tracegrid"))
}

fn write_traces(dir: &Path) -> std::io::Result<()> {
    fs::write(
        dir.join("DlDataSinr.txt"),
        "Time\tCellId\tRNTI\tSINR(dB)\n0.000\t1\t7\t10\n0.001\t1\t7\t12\n0.002\t1\t7\t14\n",
    )?;
    fs::write(
        dir.join("NrDlPdcpRxStats.txt"),
        "time(s)\tcellId\trnti\tpacketSize\tdelay(s)\n0.002\t1\t7\t125\t0.004\n",
    )
}

#[test]
fn build_writes_aligned_csv() -> TestResult {
    let tmp = TempDir::new()?;
    write_traces(tmp.path())?;
    let out = tmp.path().join("dataset.csv");

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().to_string_lossy().as_ref(),
            "--output",
            out.to_string_lossy().as_ref(),
        ])
        .assert()
        .success()
        .stdout(contains("Wrote 3 rows"))
        .stdout(contains("2/15 streams loaded"));

    let csv = fs::read_to_string(&out)?;
    let mut lines = csv.lines();
    let header = lines.next().ok_or("empty csv")?;
    assert!(header.starts_with("time,dl_sinr_mean,"));
    assert!(header.contains("dl_throughput_mbps"));
    assert_eq!(lines.count(), 3);

    Ok(())
}

#[test]
fn build_with_summary_and_report() -> TestResult {
    let tmp = TempDir::new()?;
    write_traces(tmp.path())?;
    let out = tmp.path().join("dataset.csv");
    let report = tmp.path().join("report.json");

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().to_string_lossy().as_ref(),
            "--output",
            out.to_string_lossy().as_ref(),
            "--resolution",
            "2ms",
            "--fill",
            "by-kind",
            "--parallel",
            "--summary",
            "--report",
            report.to_string_lossy().as_ref(),
        ])
        .assert()
        .success()
        .stdout(contains("Wrote 2 rows"))
        .stdout(contains("dl_data_sinr"))
        .stdout(contains("unavailable"))
        .stdout(contains("Non-zero cells"));

    let json = fs::read_to_string(&report)?;
    assert!(json.contains("\"stream\": \"dl_data_sinr\""));
    assert!(json.contains("\"state\": \"unavailable\""));

    Ok(())
}

#[test]
fn build_reads_config_file() -> TestResult {
    let tmp = TempDir::new()?;
    write_traces(tmp.path())?;
    let out = tmp.path().join("dataset.csv");
    let cfg = tmp.path().join("cfg.json");
    fs::write(&cfg, r#"{ "resolution": 0.002 }"#)?;

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().to_string_lossy().as_ref(),
            "--output",
            out.to_string_lossy().as_ref(),
            "--config",
            cfg.to_string_lossy().as_ref(),
        ])
        .assert()
        .success()
        .stdout(contains("Wrote 2 rows"));

    Ok(())
}

#[test]
fn invalid_resolution_fails() -> TestResult {
    let tmp = TempDir::new()?;
    write_traces(tmp.path())?;

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().to_string_lossy().as_ref(),
            "--output",
            tmp.path().join("x.csv").to_string_lossy().as_ref(),
            "--resolution",
            "fast",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Invalid --resolution"));

    Ok(())
}

#[test]
fn missing_trace_dir_fails() -> TestResult {
    let tmp = TempDir::new()?;

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().join("nope").to_string_lossy().as_ref(),
            "--output",
            tmp.path().join("x.csv").to_string_lossy().as_ref(),
        ])
        .assert()
        .failure()
        .stderr(contains("Trace directory not found"));

    Ok(())
}

#[test]
fn empty_trace_dir_is_no_time_data() -> TestResult {
    let tmp = TempDir::new()?;
    let out = tmp.path().join("x.csv");

    cli()
        .args([
            "build",
            "--trace-dir",
            tmp.path().to_string_lossy().as_ref(),
            "--output",
            out.to_string_lossy().as_ref(),
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Failed to build dataset"));
    assert!(!out.exists());

    Ok(())
}

#[test]
fn streams_lists_catalog() {
    cli()
        .arg("streams")
        .assert()
        .success()
        .stdout(contains("NrDlMacStats.txt"))
        .stdout(contains("dl_mac_tb_size_total"))
        .stdout(contains("ul_jitter_ms"))
        .stdout(contains("dl_sinr_cellid and dl_sinr_rnti (not cellid and rnti)"))
        .stdout(contains("(not dl_tb_size_total and dl_mcs_mean)"));
}
