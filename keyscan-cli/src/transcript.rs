use anyhow::{bail, Context, Result};

/// What the hardware reported on one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// Raw closed keys, as (row, col).
    Keys(Vec<(u8, u8)>),
    /// No new data from any row, as with a detached bus peripheral.
    Stale,
}

/// Parse a scan transcript.
///
/// One scan per line: whitespace separated `row,col` pairs for the keys
/// closed on that scan, `.` for a scan with nothing closed, or `~` for a
/// scan where no row reported. A trailing `xN` repeats the line N times.
/// `#` starts a comment; blank lines are skipped.
pub fn parse_transcript(input: &str) -> Result<Vec<Scan>> {
    let mut scans = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let mut words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let mut repeat = 1;
        if let Some(count) = words.last().and_then(|w| w.strip_prefix('x')) {
            repeat = count
                .parse::<usize>()
                .with_context(|| format!("line {}: bad repeat count '{}'", line_num + 1, count))?;
            if repeat == 0 {
                bail!("line {}: repeat count must be at least 1", line_num + 1);
            }
            words.pop();
        }

        let scan = match words.as_slice() {
            [] => bail!("line {}: repeat without a scan", line_num + 1),
            ["."] => Scan::Keys(Vec::new()),
            ["~"] => Scan::Stale,
            keys => Scan::Keys(
                keys.iter()
                    .map(|key| parse_key(key).with_context(|| format!("line {}", line_num + 1)))
                    .collect::<Result<_>>()?,
            ),
        };
        scans.extend(std::iter::repeat(scan).take(repeat));
    }

    Ok(scans)
}

fn parse_key(word: &str) -> Result<(u8, u8)> {
    let Some((row, col)) = word.split_once(',') else {
        bail!("expected row,col but got '{}'", word);
    };
    let row = row
        .parse()
        .with_context(|| format!("invalid row in '{}'", word))?;
    let col = col
        .parse()
        .with_context(|| format!("invalid column in '{}'", word))?;
    Ok((row, col))
}
