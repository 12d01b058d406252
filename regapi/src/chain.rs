//! Running pattern lists over sample lists
//!
//! Each sample is threaded through the pattern list as a left fold: the
//! accumulator is the (possibly rewritten) sample text plus whatever the
//! mode collects. Patterns are compiled once per call and shared by every
//! sample. A pattern that does not compile is reported in its own cell and
//! leaves the sample untouched.

use std::time::Duration;

use tracing::debug;

use crate::compile::{CompileContext, CompiledPattern, compile};
use crate::config::MatchConfig;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::{execute, replace_all};
use crate::pattern::PatternRecord;
use crate::result::{
    MatchOccurrence, PatternError, PatternOutcome, ReplaceResult, SampleMatches, TestOutcome,
    Validity,
};

type Compiled = std::result::Result<CompiledPattern, PatternError>;

/// Compile every record, in order
pub fn compile_all(
    ctx: &CompileContext<'_>,
    dialect: &dyn Dialect,
    patterns: &[PatternRecord],
) -> Vec<Compiled> {
    patterns
        .iter()
        .map(|record| compile(ctx, dialect, record))
        .collect()
}

/// Validity of every pattern. Nothing is executed.
pub fn run_test(
    ctx: &CompileContext<'_>,
    dialect: &dyn Dialect,
    patterns: &[PatternRecord],
) -> Vec<TestOutcome> {
    patterns
        .iter()
        .map(|record| {
            let validity = match compile(ctx, dialect, record) {
                Ok(_) => Validity::Valid,
                Err(error) => Validity::Invalid(error),
            };
            TestOutcome::new(record.id, validity)
        })
        .collect()
}

/// Match every pattern against every sample.
///
/// With chaining on, each pattern except the last rewrites the sample with
/// its replacement before the next pattern runs. Results leave through
/// `config`'s truncation and whitespace rules.
pub fn run_match(
    ctx: &CompileContext<'_>,
    dialect: &dyn Dialect,
    patterns: &[PatternRecord],
    samples: &[String],
    config: &MatchConfig,
) -> Result<Vec<SampleMatches>> {
    let compiled = compile_all(ctx, dialect, patterns);
    debug!(
        engine = ctx.capabilities.id(),
        patterns = compiled.len(),
        samples = samples.len(),
        chain = config.chain_regexes(),
        "running match"
    );

    samples
        .iter()
        .enumerate()
        .map(|(input_id, sample)| match_sample(&compiled, input_id, sample, config))
        .collect()
}

fn match_sample(
    compiled: &[Compiled],
    input_id: usize,
    sample: &str,
    config: &MatchConfig,
) -> Result<SampleMatches> {
    let last = compiled.len().saturating_sub(1);
    let init = (sample.to_string(), Vec::with_capacity(compiled.len()), Duration::ZERO);

    let (_, all_matches, total_execution_time) = compiled.iter().enumerate().try_fold(
        init,
        |(text, mut outcomes, total), (index, entry)| -> Result<_> {
            let pattern = match entry {
                Ok(pattern) => pattern,
                Err(error) => {
                    outcomes.push(PatternOutcome {
                        regex_id: error.regex_id,
                        error: Validity::Invalid(error.clone()),
                        execution_time: Duration::ZERO,
                        matches: Vec::new(),
                    });
                    return Ok((text, outcomes, total));
                }
            };

            let found = execute(pattern, &text)?;
            outcomes.push(PatternOutcome {
                regex_id: pattern.id(),
                error: Validity::Valid,
                execution_time: found.duration,
                matches: found.value.into_iter().map(|m| present(config, m)).collect(),
            });

            let text = if config.chain_regexes() && index < last {
                replace_all(pattern, &text)?.value
            } else {
                text
            };
            Ok((text, outcomes, total + found.duration))
        },
    )?;

    Ok(SampleMatches {
        input_id,
        sample: config.present_sample(sample),
        all_matches,
        total_execution_time,
    })
}

fn present(config: &MatchConfig, occurrence: MatchOccurrence) -> MatchOccurrence {
    MatchOccurrence {
        whole: config.present_whole(&occurrence.whole),
        parts: occurrence.parts.map_values(|text| config.present_sub(text)),
        position: occurrence.position,
    }
}

/// Apply every pattern's replacement to every sample, in pattern order
pub fn run_replace(
    ctx: &CompileContext<'_>,
    dialect: &dyn Dialect,
    patterns: &[PatternRecord],
    samples: &[String],
) -> Result<Vec<ReplaceResult>> {
    let compiled = compile_all(ctx, dialect, patterns);
    debug!(
        engine = ctx.capabilities.id(),
        patterns = compiled.len(),
        samples = samples.len(),
        "running replace"
    );

    samples
        .iter()
        .map(|sample| {
            let (text, duration) = compiled.iter().filter_map(|entry| entry.as_ref().ok()).try_fold(
                (sample.clone(), Duration::ZERO),
                |(text, total), pattern| -> Result<_> {
                    let replaced = replace_all(pattern, &text)?;
                    Ok((replaced.value, total + replaced.duration))
                },
            )?;
            Ok(ReplaceResult { text, duration })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::EngineCapabilities;
    use crate::config::MatchConfigProp;
    use crate::dialect::StandardDialect;
    use crate::registry;

    fn engine() -> EngineCapabilities {
        registry::builtin().unwrap().get("rust-regex").unwrap().clone()
    }

    fn samples(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_replace_pipeline() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a").modifiers("g").replace("X"),
            PatternRecord::new(2, "X").modifiers("g").replace("Y"),
        ];
        let results = run_replace(&ctx, &StandardDialect, &patterns, &samples(&["banana"])).unwrap();
        assert_eq!(results[0].text, "bYnYnY");
    }

    #[test]
    fn test_replace_pipeline_without_global_modifier() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a").replace("X"),
            PatternRecord::new(2, "X").replace("Y"),
        ];
        let results = run_replace(&ctx, &StandardDialect, &patterns, &samples(&["banana"])).unwrap();
        assert_eq!(results[0].text, "bYnYnY");
    }

    #[test]
    fn test_match_chain_replaces_every_occurrence() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a").replace("X"),
            PatternRecord::new(2, "X").modifiers("g"),
        ];
        let config = caps.match_config().clone();
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["banana"]), &config).unwrap();
        let outcomes = &results[0].all_matches;
        // without `g` only the first match is reported, but chaining rewrites all of them
        assert_eq!(outcomes[0].matches.len(), 1);
        let positions: Vec<usize> = outcomes[1].matches.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn test_replace_skips_invalid_patterns() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "(").replace("X"),
            PatternRecord::new(2, "n").modifiers("g").replace("N"),
        ];
        let results = run_replace(&ctx, &StandardDialect, &patterns, &samples(&["banana"])).unwrap();
        assert_eq!(results[0].text, "baNaNa");
    }

    #[test]
    fn test_match_chains_all_but_last() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a").modifiers("g").replace("X"),
            PatternRecord::new(2, "X").modifiers("g").replace("Z"),
        ];
        let config = caps.match_config().clone();
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["banana"]), &config).unwrap();
        let outcomes = &results[0].all_matches;
        assert_eq!(outcomes[0].matches.len(), 3);
        assert_eq!(outcomes[1].matches.len(), 3);
        assert_eq!(outcomes[1].matches[0].position, 1);
        assert_eq!(results[0].sample, "banana");
    }

    #[test]
    fn test_match_without_chaining_sees_original() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a").modifiers("g").replace("X"),
            PatternRecord::new(2, "X").modifiers("g"),
        ];
        let config = caps
            .match_config()
            .clone()
            .with(MatchConfigProp::ChainRegexes(false));
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["banana"]), &config).unwrap();
        assert!(results[0].all_matches[1].matches.is_empty());
    }

    #[test]
    fn test_invalid_pattern_cell() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(7, "(abc"),
            PatternRecord::new(8, "b").modifiers("g"),
        ];
        let config = caps.match_config().clone();
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["abc", "bb"]), &config)
                .unwrap();
        assert_eq!(results.len(), 2);
        for (input_id, sample) in results.iter().enumerate() {
            assert_eq!(sample.input_id, input_id);
            let broken = &sample.all_matches[0];
            assert_eq!(broken.regex_id, 7);
            assert!(!broken.error.is_valid());
            assert!(broken.matches.is_empty());
            assert_eq!(broken.execution_time, Duration::ZERO);
            assert!(sample.all_matches[1].error.is_valid());
        }
        assert_eq!(results[1].all_matches[1].matches.len(), 2);
    }

    #[test]
    fn test_total_time_is_sum() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![
            PatternRecord::new(1, "a+").modifiers("g"),
            PatternRecord::new(2, "b+").modifiers("g"),
        ];
        let config = caps.match_config().clone();
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["aabb"]), &config).unwrap();
        let sum: Duration = results[0].all_matches.iter().map(|o| o.execution_time).sum();
        assert_eq!(results[0].total_execution_time, sum);
    }

    #[test]
    fn test_results_truncated_at_output() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![PatternRecord::new(1, "(a+) b").modifiers("g")];
        let config = caps
            .match_config()
            .clone()
            .with(MatchConfigProp::MaxWholeMatchLen(4))
            .with(MatchConfigProp::MaxSubMatchLen(2))
            .with(MatchConfigProp::MaxReturnSampleLen(3))
            .with(MatchConfigProp::ShowWhiteSpaceChars(true));
        let results =
            run_match(&ctx, &StandardDialect, &patterns, &samples(&["aaa b"]), &config).unwrap();
        let occurrence = &results[0].all_matches[0].matches[0];
        assert_eq!(occurrence.whole, "aaa[");
        assert_eq!(occurrence.parts.get("1"), Some(Some("aa")));
        assert_eq!(results[0].sample, "aaa");
    }

    #[test]
    fn test_run_test_reports_each_pattern() {
        let caps = engine();
        let ctx = CompileContext::new(&caps);
        let patterns = vec![PatternRecord::new(1, "a"), PatternRecord::new(2, "[")];
        let outcomes = run_test(&ctx, &StandardDialect, &patterns);
        assert!(outcomes[0].valid);
        assert!(!outcomes[1].valid);
        assert_eq!(outcomes[1].error.as_ref().unwrap().regex_id, 2);
    }
}
