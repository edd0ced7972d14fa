//! CSV replay of recorded candidate streams
//!
//! Input rows are `frame,timestamp,x,y,weight`, one row per candidate. A frame
//! without candidates is written as `frame,timestamp,,,`. Consecutive rows of
//! the same frame are grouped. Blank lines and `#` comments are ignored, and
//! an optional header may precede the first data row.
//!
//! Output rows are `frame,timestamp,x,y` with empty `x,y` when the ball was
//! not found.

use crate::error::{Result, StreamError};
use crate::worker::FrameInput;
use balltrack::{Candidate, FrameEstimate, FrameIndex};
use std::io::BufRead;

pub const OUTPUT_HEADER: &str = "frame,timestamp,x,y";

struct Row {
    frame: FrameIndex,
    timestamp: f64,
    candidate: Option<Candidate>,
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, name: &str, line: usize) -> Result<T> {
    let field = field.ok_or_else(|| StreamError::parse(line, format!("missing {}", name)))?;
    field
        .trim()
        .parse()
        .map_err(|_| StreamError::parse(line, format!("invalid {} '{}'", name, field.trim())))
}

fn parse_row(text: &str, line: usize) -> Result<Row> {
    let mut fields = text.split(',');
    let frame = parse_field(fields.next(), "frame", line)?;
    let timestamp = parse_field(fields.next(), "timestamp", line)?;

    let rest: Vec<&str> = fields.map(str::trim).collect();
    let candidate = match rest.as_slice() {
        [] => None,
        parts if parts.iter().all(|p| p.is_empty()) => None,
        [x, y, weight] => Some(Candidate::new(
            parse_field(Some(*x), "x", line)?,
            parse_field(Some(*y), "y", line)?,
            parse_field(Some(*weight), "weight", line)?,
        )),
        parts => {
            return Err(StreamError::parse(
                line,
                format!("expected x,y,weight but got {} fields", parts.len()),
            ))
        }
    };

    Ok(Row {
        frame,
        timestamp,
        candidate,
    })
}

fn is_header(text: &str) -> bool {
    text.split(',')
        .next()
        .map(|f| f.trim().parse::<FrameIndex>().is_err())
        .unwrap_or(false)
}

/// Groups candidate rows into frames
pub struct FrameReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    /// Set once the first non-comment row has been seen
    seen_row: bool,
    pending: Option<Row>,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            seen_row: false,
            pending: None,
        }
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        for text in self.lines.by_ref() {
            let text = text?;
            self.line_no += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let first_row = !self.seen_row;
            self.seen_row = true;
            if first_row && is_header(trimmed) {
                continue;
            }
            return parse_row(trimmed, self.line_no).map(Some);
        }
        Ok(None)
    }

    fn next_frame(&mut self) -> Result<Option<FrameInput>> {
        let first = match self.pending.take() {
            Some(row) => row,
            None => match self.next_row()? {
                Some(row) => row,
                None => return Ok(None),
            },
        };

        let mut input = FrameInput {
            frame: first.frame,
            timestamp: first.timestamp,
            candidates: first.candidate.into_iter().collect(),
        };

        while let Some(row) = self.next_row()? {
            if row.frame != input.frame {
                self.pending = Some(row);
                break;
            }
            input.candidates.extend(row.candidate);
        }
        Ok(Some(input))
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<FrameInput>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

pub fn format_estimate(estimate: &FrameEstimate) -> String {
    match estimate.position {
        Some(p) => format!("{},{},{},{}", estimate.frame, estimate.timestamp, p.x, p.y),
        None => format!("{},{},,", estimate.frame, estimate.timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use std::io::Cursor;

    fn read_all(text: &str) -> Result<Vec<FrameInput>> {
        FrameReader::new(Cursor::new(text.to_string())).collect()
    }

    #[test]
    fn test_groups_rows_by_frame() {
        let frames = read_all(
            "frame,timestamp,x,y,weight\n\
             0,0.0,0.1,0.2,1.5\n\
             0,0.0,0.8,0.3,0.5\n\
             1,0.01,,,\n\
             2,0.02,0.12,0.21,2.0\n",
        )
        .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].frame, 0);
        assert_eq!(frames[0].candidates.len(), 2);
        assert_eq!(frames[0].candidates[1].weight, 0.5);
        assert!(frames[1].candidates.is_empty());
        assert_eq!(frames[2].timestamp, 0.02);
        assert_eq!(frames[2].candidates[0].position, Point2::new(0.12, 0.21));
    }

    #[test]
    fn test_headerless_input_with_blank_lines() {
        let frames = read_all("3,1.0,0.5,0.5,1.0\n\n4,1.1\n").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame, 3);
        assert!(frames[1].candidates.is_empty());
    }

    #[test]
    fn test_header_after_comments() {
        let frames = read_all(
            "# recorded on table 2\n\
             \n\
             frame,timestamp,x,y,weight\n\
             0,0.0,0.1,0.2,1.5\n",
        )
        .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].candidates.len(), 1);

        // only the first row may be a header
        let err = read_all("0,0.0,0.1,0.2,1.5\nframe,timestamp,x,y,weight\n").unwrap_err();
        assert!(matches!(err, StreamError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_reports_line_of_bad_row() {
        let err = read_all("0,0.0,0.1,0.2,1.0\n1,0.1,abc,0.2,1.0\n").unwrap_err();
        match err {
            StreamError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("x"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(read_all("0,0.0,0.1,0.2\n").is_err());
    }

    #[test]
    fn test_format_estimate() {
        let found = FrameEstimate {
            frame: 7,
            timestamp: 0.5,
            position: Some(Point2::new(0.25, 1.5)),
        };
        let missing = FrameEstimate {
            frame: 8,
            timestamp: 0.75,
            position: None,
        };
        assert_eq!(format_estimate(&found), "7,0.5,0.25,1.5");
        assert_eq!(format_estimate(&missing), "8,0.75,,");
    }
}
