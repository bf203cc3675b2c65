/// Knobs for the execution engine. Fixed when a grammar is compiled, so
/// every run of a [`CompiledGrammar`](crate::CompiledGrammar) behaves the
/// same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// Cache (rule, position) results for the duration of one run (packrat
    /// parsing). Without it, backtracking-heavy grammars can take
    /// exponential time.
    pub memoize: bool,

    /// Maximum nesting of matchers during a run: every rule reference,
    /// sequence, choice, repetition, optional and lookaround counts as one
    /// level. Deeper input fails with `RunError::DepthExceeded` instead of
    /// overflowing the native stack. The default leaves room to spare on a
    /// 2 MiB thread stack in a debug build.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            memoize: true,
            max_depth: 256,
        }
    }
}
