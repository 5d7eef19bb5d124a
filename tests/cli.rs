use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn transcribe_rt_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_transcribe-rt").expect("transcribe-rt test binary not built")
}

fn transcribe_file_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_transcribe-file").expect("transcribe-file test binary not built")
}

#[test]
fn transcribe_rt_help_mentions_name() {
    let output = Command::new(transcribe_rt_bin())
        .arg("--help")
        .output()
        .expect("run transcribe-rt --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("voxscribe"));
    assert!(combined.contains("--energy_threshold"));
    assert!(combined.contains("--phrase_timeout"));
}

#[test]
fn transcribe_file_help_mentions_batch_flags() {
    let output = Command::new(transcribe_file_bin())
        .arg("--help")
        .output()
        .expect("run transcribe-file --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("voxscribe"));
    assert!(combined.contains("--outdir"));
    assert!(combined.contains("--frame_rate"));
}

#[test]
fn transcribe_rt_list_input_devices_prints_message() {
    let output = Command::new(transcribe_rt_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run transcribe-rt --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn transcribe_rt_rejects_invalid_energy_threshold() {
    let output = Command::new(transcribe_rt_bin())
        .args(["--energy_threshold", "0", "--list-input-devices"])
        .output()
        .expect("run transcribe-rt with bad threshold");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--energy_threshold"));
}

#[test]
fn transcribe_file_requires_file_flag() {
    let output = Command::new(transcribe_file_bin())
        .output()
        .expect("run transcribe-file with no args");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--file"));
}
