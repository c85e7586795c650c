//! Centralized constants for ctxprobe.
//!
//! All magic numbers, default strings, and search defaults live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "ctxprobe";

/// Model probed when neither the CLI nor the config names one.
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "ctxprobe.toml";

/// Environment variable that overrides the configured endpoint URL.
pub const BASE_URL_ENV: &str = "CTXPROBE_BASE_URL";

/// Default base URL for a local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Subdirectory of the data dir that receives run reports.
pub const RESULTS_DIRNAME: &str = "results";

/// Filename prefix for run reports.
pub const REPORT_FILE_PREFIX: &str = "capacity_results";

// --- Classifier thresholds ---

/// Observed input below `requested * ratio` counts as truncation.
pub const TRUNCATION_THRESHOLD_DEFAULT: f64 = 0.85;

/// Observed tokens at or below `previous_best * ratio` count as a plateau.
pub const PLATEAU_THRESHOLD_DEFAULT: f64 = 1.1;

// --- Search schedule ---

/// Prompt sizes (approximate tokens) for default-limit discovery.
pub const DEFAULT_LIMIT_SIZES: &[u64] = &[2_000, 4_000, 8_000, 16_000];

/// Context-window values for extended-window discovery.
pub const WINDOW_SIZES: &[u32] = &[8_192, 16_384, 32_768, 65_536, 131_072];

/// Output-token budgets for output-budget discovery.
pub const OUTPUT_BUDGETS: &[u64] = &[1_024, 2_048, 4_096, 8_192, 16_384];

/// Prompt sizes for the performance sweep.
pub const PERFORMANCE_SIZES: &[u64] = &[2_000, 4_000, 8_000, 16_000, 32_000];

/// Fraction of the window under test that the prompt is sized to.
pub const WINDOW_FILL_RATIO_DEFAULT: f64 = 0.9;

/// Output budget for context probes; they only need to prove the input was read.
pub const CONTEXT_PROBE_OUTPUT_TOKENS: u64 = 100;

// --- Safety margins ---

/// Margin applied to `native_context` to derive the recommended input size.
pub const INPUT_MARGIN_DEFAULT: f64 = 0.8;

/// Margin applied to `max_output` to derive the recommended output size.
pub const OUTPUT_MARGIN_DEFAULT: f64 = 0.9;

// --- Timeouts (seconds) ---

/// Per-call timeout for context probes.
pub const CONTEXT_TIMEOUT_SECS_DEFAULT: u64 = 300;

/// Per-call timeout for output-budget probes.
pub const OUTPUT_TIMEOUT_SECS_DEFAULT: u64 = 600;

/// Timeout for the model metadata lookup.
pub const METADATA_TIMEOUT_SECS_DEFAULT: u64 = 30;

// --- Prompts ---

/// Filler phrase repeated to pad synthetic prompts.
pub const FILLER_PHRASE: &str = "The quick brown fox jumps over the lazy dog. ";

/// Instruction placed before the filler text.
pub const SUMMARY_PREAMBLE: &str = "Please summarize the following text in 2-3 sentences:\n\n";

/// Instruction placed after the filler text.
pub const SUMMARY_SUFFIX: &str = "\n\nSummary:";

/// Prompt used by output-budget probes to coax the longest possible answer.
pub const OUTPUT_PROMPT: &str = "Write a very long detailed technical document. \
Include many sections, subsections, and detailed explanations. \
Continue until you reach your maximum. Section 1:";

/// Characters per token assumed by the cheap estimator.
pub const CHARS_PER_TOKEN: usize = 4;
