//! Analyzer invocation.
//!
//! Analyzers are opaque external processes. The contract: invoked with the
//! video source path and the lane list serialized as JSON, they write
//! newline-delimited output to stdout where each measurement is one JSON
//! object and anything else is ignorable diagnostics.

use crate::error::SuperviseError;
use crate::model::Video;

/// Fully resolved analyzer command line.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments, script path first.
    pub args: Vec<String>,
}

impl AnalyzerCommand {
    /// Builds the standard analyzer invocation:
    /// `<program> <script> --video_path <link> --lanes <json> [--debug]`.
    pub fn build(
        program: impl Into<String>,
        script: impl Into<String>,
        video: &Video,
        debug: bool,
    ) -> Result<Self, SuperviseError> {
        let lanes = serde_json::to_string(&video.lanes)
            .map_err(|source| SuperviseError::LaneEncoding { source })?;

        let mut args = vec![
            script.into(),
            "--video_path".to_string(),
            video.link.clone(),
            "--lanes".to_string(),
            lanes,
        ];
        if debug {
            args.push("--debug".to_string());
        }
        Ok(Self {
            program: program.into(),
            args,
        })
    }

    /// Wraps an arbitrary command line. The caller owns the contract that the
    /// program emits line-oriented measurement output.
    pub fn raw(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Lane;

    fn video() -> Video {
        Video {
            id: "v-1".to_string(),
            link: "rtsp://cam/1".to_string(),
            lanes: vec![Lane {
                id: "L1".to_string(),
                name: "north".to_string(),
                coords: [[0.0, 0.0], [10.0, 0.0], [0.0, 20.0], [10.0, 20.0]],
                length: 25.0,
                width: 3.5,
                max_speed: 60.0,
            }],
        }
    }

    #[test]
    fn build_serializes_lanes_and_flags() {
        let cmd = AnalyzerCommand::build("python3", "speed.py", &video(), true).unwrap();
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args[0], "speed.py");
        assert_eq!(cmd.args[1], "--video_path");
        assert_eq!(cmd.args[2], "rtsp://cam/1");
        assert_eq!(cmd.args[3], "--lanes");
        assert!(cmd.args[4].contains("\"id\":\"L1\""));
        assert_eq!(cmd.args.last().map(String::as_str), Some("--debug"));
    }

    #[test]
    fn build_without_debug_omits_flag() {
        let cmd = AnalyzerCommand::build("python3", "occ.py", &video(), false).unwrap();
        assert!(!cmd.args.iter().any(|a| a == "--debug"));
    }
}
