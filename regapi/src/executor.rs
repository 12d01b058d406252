//! Running compiled patterns against samples
//!
//! Matching always sees the full sample. Offsets are reported in
//! characters; truncation for output happens later, in the chain runner.

use std::time::Instant;

use crate::compile::{CompiledPattern, ScanMode};
use crate::dialect::RawMatch;
use crate::error::{EngineError, Result};
use crate::result::{Groups, MatchOccurrence, Timed};

/// Every match (or the first one, in [`ScanMode::FindFirst`]) of `compiled`
/// in `sample`
pub fn execute(compiled: &CompiledPattern, sample: &str) -> Result<Timed<Vec<MatchOccurrence>>> {
    let started = Instant::now();
    let names = compiled.native().group_names();
    let mut occurrences = Vec::new();
    let mut offsets = CharOffsets::default();

    let first_only = compiled.scan_mode() == ScanMode::FindFirst;
    scan(compiled, sample, first_only, |m| {
        let mut parts = Groups::new();
        for (index, span) in m.groups.iter().enumerate() {
            parts.push((index + 1).to_string(), captured(sample, *span));
        }
        for (name, span) in names.iter().zip(&m.groups) {
            if let Some(name) = name {
                parts.push(name.clone(), captured(sample, *span));
            }
        }
        occurrences.push(MatchOccurrence {
            whole: sample[m.start..m.end].to_string(),
            parts,
            position: offsets.at(sample, m.start),
        });
    })?;

    Ok(Timed {
        value: occurrences,
        duration: started.elapsed(),
    })
}

/// `sample` with every match replaced by the expanded replacement template.
/// Replacement ignores the scan mode: all occurrences are always replaced.
pub fn replace_all(compiled: &CompiledPattern, sample: &str) -> Result<Timed<String>> {
    let started = Instant::now();
    let names = compiled.native().group_names();
    let mut output = String::with_capacity(sample.len());
    let mut copied = 0;

    scan(compiled, sample, false, |m| {
        output.push_str(&sample[copied..m.start]);
        compiled
            .replacement()
            .apply_into(&mut output, sample, m.start, m.end, &m.groups, names);
        copied = m.end;
    })?;
    output.push_str(&sample[copied..]);

    Ok(Timed {
        value: output,
        duration: started.elapsed(),
    })
}

fn scan(
    compiled: &CompiledPattern,
    text: &str,
    first_only: bool,
    mut on_match: impl FnMut(&RawMatch),
) -> Result<()> {
    let native = compiled.native();
    let mut pos = 0;

    while pos <= text.len() {
        let found = native
            .captures_at(text, pos)
            .map_err(|e| EngineError::Execution {
                regex_id: compiled.id(),
                message: e.to_string(),
            })?;
        let Some(m) = found else {
            break;
        };
        if compiled.anchored() && m.start != pos {
            break;
        }
        on_match(&m);

        if first_only {
            break;
        }
        pos = if m.end > m.start {
            m.end
        } else {
            // step over one character so an empty match cannot repeat
            m.end + text[m.end..].chars().next().map_or(1, char::len_utf8)
        };
    }

    Ok(())
}

fn captured(sample: &str, span: Option<(usize, usize)>) -> Option<String> {
    span.map(|(start, end)| sample[start..end].to_string())
}

/// Byte to character offset conversion for increasing byte offsets
#[derive(Default)]
struct CharOffsets {
    byte: usize,
    chars: usize,
}

impl CharOffsets {
    fn at(&mut self, text: &str, byte: usize) -> usize {
        if byte < self.byte {
            *self = CharOffsets::default();
        }
        self.chars += text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}
