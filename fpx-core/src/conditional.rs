//! Conditional-compilation state machine: a fixed-depth stack of branch
//! states implementing first-match semantics across one `#if`/`#elif*`/
//! `#else`/`#endif` group.

/// Diagnostics-worthy conditional-stack misuse. These never abort the run;
/// the caller (directive dispatch) logs them and treats the directive as a
/// no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalError {
    /// `#elif`/`#elifdef`/`#elifndef`/`#else`/`#endif` seen with no open `#if`.
    Unmatched,
    /// Nesting exceeded [`MAX_COND_DEPTH`].
    DepthOverflow,
}

impl std::fmt::Display for ConditionalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unmatched => write!(f, "directive without matching #if"),
            Self::DepthOverflow => write!(f, "conditional nesting too deep"),
        }
    }
}

/// Compile-time bound on `#if` nesting depth (spec requires at least 50).
pub const MAX_COND_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy)]
struct Branch {
    active: bool,
    has_met: bool,
}

/// Stack of [`Branch`] states. The sentinel at depth 0 (`active = true,
/// has_met = false`) is always present and is never popped; it represents
/// "outside any `#if`".
#[derive(Debug, Clone)]
pub struct ConditionalStack {
    levels: Vec<Branch>,
}

impl Default for ConditionalStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self { levels: vec![Branch { active: true, has_met: false }] }
    }

    /// Nesting depth, excluding the sentinel (0 means "not inside any `#if`").
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    fn parent_active(&self) -> bool {
        self.levels.last().map_or(true, |b| b.active)
    }

    /// AND of `active` across every level up to and including the current one.
    pub fn is_active(&self) -> bool {
        self.levels.iter().all(|b| b.active)
    }

    pub fn push_if(&mut self, cond: bool) -> Result<(), ConditionalError> {
        if self.levels.len() > MAX_COND_DEPTH {
            return Err(ConditionalError::DepthOverflow);
        }
        let parent_active = self.parent_active();
        self.levels.push(Branch { active: cond && parent_active, has_met: cond });
        Ok(())
    }

    pub fn elif(&mut self, cond: bool) -> Result<(), ConditionalError> {
        let parent_active = self.parent_active_below_top();
        let top = self.top_mut()?;
        if top.has_met {
            top.active = false;
        } else if cond {
            top.active = parent_active;
            top.has_met = true;
        } else {
            top.active = false;
        }
        Ok(())
    }

    pub fn else_branch(&mut self) -> Result<(), ConditionalError> {
        let parent_active = self.parent_active_below_top();
        let top = self.top_mut()?;
        if top.has_met {
            top.active = false;
        } else {
            top.active = parent_active;
            top.has_met = true;
        }
        Ok(())
    }

    pub fn endif(&mut self) -> Result<(), ConditionalError> {
        if self.levels.len() <= 1 {
            return Err(ConditionalError::Unmatched);
        }
        self.levels.pop();
        Ok(())
    }

    fn top_mut(&mut self) -> Result<&mut Branch, ConditionalError> {
        if self.levels.len() <= 1 {
            return Err(ConditionalError::Unmatched);
        }
        let last = self.levels.len() - 1;
        Ok(&mut self.levels[last])
    }

    fn parent_active_below_top(&self) -> bool {
        if self.levels.len() < 2 {
            return true;
        }
        self.levels[..self.levels.len() - 1].iter().all(|b| b.active)
    }
}
