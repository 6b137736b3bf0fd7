use serde::{Deserialize, Serialize};

/// One update on the export progress channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub percent: u8,
    pub stage: String,
}

impl ExportProgress {
    pub fn new(percent: u8, stage: &str) -> Self {
        Self {
            percent: percent.min(100),
            stage: stage.to_string(),
        }
    }
}

/// Fraction of `total_duration` reached according to one FFmpeg progress line.
///
/// Understands both the `-progress` key/value output (`out_time=00:00:05.000000`,
/// `progress=end`) and the classic status line (`... time=00:00:05.00 bitrate=...`).
pub fn parse_progress_line(line: &str, total_duration: f64) -> Option<f64> {
    let line = line.trim();
    if line == "progress=end" {
        return Some(1.0);
    }

    let time_pos = line.find("time=")?;
    let time_value = line[time_pos + 5..].split_whitespace().next()?;
    let current_time = parse_time_string(time_value)?;

    if total_duration > 0.0 {
        Some((current_time / total_duration).clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Parse FFmpeg time format (HH:MM:SS.micros)
fn parse_time_string(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() == 3 {
        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;
        return Some(hours * 3600.0 + minutes * 60.0 + seconds);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_line() {
        let line = "frame=  100 fps= 30 q=28.0 size=    1024kB time=00:00:10.00 bitrate= 838.9kbits/s";
        let progress = parse_progress_line(line, 100.0).unwrap();
        assert!((progress - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_parse_progress_pipe_output() {
        assert_eq!(parse_progress_line("out_time=00:00:05.000000", 20.0), Some(0.25));
        assert_eq!(parse_progress_line("progress=end", 20.0), Some(1.0));
        assert_eq!(parse_progress_line("out_time=N/A", 20.0), None);
        assert_eq!(parse_progress_line("out_time_ms=5000000", 20.0), None);
        assert_eq!(parse_progress_line("out_time=00:01:00.000000", 20.0), Some(1.0));
    }

    #[test]
    fn test_parse_time_string() {
        assert_eq!(parse_time_string("00:01:30.50"), Some(90.5));
        assert_eq!(parse_time_string("01:00:00.00"), Some(3600.0));
    }

    #[test]
    fn test_percent_is_capped() {
        assert_eq!(ExportProgress::new(140, "x").percent, 100);
    }
}
