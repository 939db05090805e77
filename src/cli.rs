use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::InfoLevel;

/// fpx is a C-preprocessor-style directive engine for a Fortran dialect:
/// macro expansion, conditional compilation, and `#include` resolution over
/// Fortran source that also carries `#define`/`#if`/`#pragma` directives.
///
/// Reads `input` (or an interactive prompt if omitted and stdin is a TTY)
/// and writes the preprocessed result to `output`, or standard output if no
/// output path is given.
#[derive(Parser, Debug)]
#[clap(about, version)]
pub struct Cli {
    /// Input file to preprocess
    pub input: Option<PathBuf>,

    /// Output file; standard output if omitted
    pub output: Option<PathBuf>,

    /// Add a directory to the `#include` search path (repeatable)
    #[clap(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Predefine a macro as `NAME` or `NAME=value` (repeatable)
    #[clap(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub define: Vec<String>,

    /// Undefine a macro before preprocessing starts (repeatable)
    #[clap(short = 'U', long = "undef", value_name = "NAME")]
    pub undef: Vec<String>,

    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// Disable macro expansion of non-directive lines
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
    pub expand_macros: bool,

    /// Strip `/* ... */` block comments from the output
    #[clap(long = "strip-comments", action)]
    pub strip_comments: bool,

    /// Treat a trailing `\\` as a hard line break rather than a continuation
    #[clap(long = "line-break", action)]
    pub line_break: bool,

    /// Enable `__FILENAME__` and `__TIMESTAMP__` built-ins
    #[clap(long = "extra-macros", action)]
    pub extra_macros: bool,
}
