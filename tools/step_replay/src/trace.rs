use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{anyhow, bail, Context, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayOp {
    Start,
    Stop,
    Reset,
    Tick,
    Detector,
    Counter(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayStep {
    pub ms: u64,
    pub op: ReplayOp,
}

const HEADER: &str = "step_trace,ms,op,value";

pub fn parse_trace(path: &Path) -> Result<Vec<ReplayStep>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_lines(BufReader::new(file), &path.display().to_string())
}

pub fn parse_lines(reader: impl BufRead, origin: &str) -> Result<Vec<ReplayStep>> {
    let mut out = Vec::new();
    let mut last_ms = 0u64;
    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.with_context(|| format!("failed to read {origin}:{line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == HEADER {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts[0] != "step_trace" {
            continue;
        }
        if parts.len() < 3 {
            bail!("{origin}:{line_no} invalid trace line, expected at least 3 columns");
        }

        let ms: u64 = parts[1]
            .parse()
            .map_err(|e| anyhow!("{origin}:{line_no} invalid ms '{}': {e}", parts[1]))?;
        if ms < last_ms {
            bail!("{origin}:{line_no} timestamps must not go backwards ({ms} < {last_ms})");
        }
        last_ms = ms;

        let op = match (parts[2], parts.get(3)) {
            ("start", _) => ReplayOp::Start,
            ("stop", _) => ReplayOp::Stop,
            ("reset", _) => ReplayOp::Reset,
            ("tick", _) => ReplayOp::Tick,
            ("detector", _) => ReplayOp::Detector,
            ("counter", Some(value)) => ReplayOp::Counter(
                value
                    .parse()
                    .map_err(|e| anyhow!("{origin}:{line_no} invalid counter '{value}': {e}"))?,
            ),
            ("counter", None) => bail!("{origin}:{line_no} counter needs a cumulative value"),
            (other, _) => bail!("{origin}:{line_no} unknown op '{other}'"),
        };
        out.push(ReplayStep { ms, op });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parses_ops_and_skips_comments() {
        let raw = "# demo\nstep_trace,ms,op,value\nstep_trace,0,start\nstep_trace,5,counter,5000\nstep_trace,9,detector\n";
        let steps = parse_lines(Cursor::new(raw), "inline").expect("trace should parse");
        assert_eq!(
            steps,
            vec![
                ReplayStep { ms: 0, op: ReplayOp::Start },
                ReplayStep { ms: 5, op: ReplayOp::Counter(5_000) },
                ReplayStep { ms: 9, op: ReplayOp::Detector },
            ]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        let cases = [
            ("step_trace,0,counter", "counter needs a cumulative value"),
            ("step_trace,0,jump", "unknown op 'jump'"),
            ("step_trace,abc,start", "invalid ms 'abc'"),
            ("step_trace,9,start\nstep_trace,3,stop", "timestamps must not go backwards"),
        ];
        for (raw, expected) in cases {
            let err = parse_lines(Cursor::new(raw), "inline").expect_err("line should fail");
            assert!(err.to_string().contains(expected), "{raw}: {err}");
        }
    }

    #[test]
    fn reads_trace_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.csv");
        std::fs::write(&path, "step_trace,0,start\nstep_trace,1,tick\n").expect("write");
        assert_eq!(parse_trace(&path).expect("parse").len(), 2);
    }
}
