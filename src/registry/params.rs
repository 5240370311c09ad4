//! Parameterized test expansion.
//!
//! One test template plus K parameter cases becomes K independent test
//! descriptors. Each case's initializer runs after the fixture's own setup on
//! a fresh data instance, so no state is shared between cases.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use super::fixture::Hook;

/// One parameter case: an initializer applied after fixture setup.
pub struct ParamCase<T> {
    tag: Option<String>,
    location: &'static Location<'static>,
    init: Hook<T>,
}

impl<T> ParamCase<T> {
    /// Create a case tagged by its declaration line (`L<line>`).
    #[track_caller]
    pub fn new(init: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        Self {
            tag: None,
            location: Location::caller(),
            init: Arc::new(init),
        }
    }

    /// Create a case with an explicit tag.
    #[track_caller]
    pub fn tagged(tag: impl Into<String>, init: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        Self {
            tag: Some(tag.into()),
            location: Location::caller(),
            init: Arc::new(init),
        }
    }

    /// Where the case was declared.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// A case after expansion: its position, its final tag and its initializer.
pub(crate) struct CaseBinding<T> {
    pub index: usize,
    pub tag: String,
    pub init: Hook<T>,
}

impl<T> Clone for CaseBinding<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            tag: self.tag.clone(),
            init: Arc::clone(&self.init),
        }
    }
}

/// Assign a unique, stable tag to every case.
///
/// Line tags that collide widen to `L<line>:<column>`; anything still
/// colliding gets a `#<index>` suffix.
pub(crate) fn expand<T>(cases: Vec<ParamCase<T>>) -> Vec<CaseBinding<T>> {
    let mut line_uses: HashMap<u32, usize> = HashMap::new();
    for case in cases.iter().filter(|c| c.tag.is_none()) {
        *line_uses.entry(case.location.line()).or_default() += 1;
    }

    let tags: Vec<String> = cases
        .iter()
        .map(|case| match &case.tag {
            Some(tag) => tag.clone(),
            None if line_uses[&case.location.line()] > 1 => {
                format!("L{}:{}", case.location.line(), case.location.column())
            }
            None => format!("L{}", case.location.line()),
        })
        .collect();

    let mut tag_uses: HashMap<&str, usize> = HashMap::new();
    for tag in &tags {
        *tag_uses.entry(tag.as_str()).or_default() += 1;
    }
    let tags: Vec<String> = tags
        .iter()
        .enumerate()
        .map(|(index, tag)| {
            if tag_uses[tag.as_str()] > 1 {
                format!("{}#{}", tag, index)
            } else {
                tag.clone()
            }
        })
        .collect();

    cases
        .into_iter()
        .zip(tags)
        .enumerate()
        .map(|(index, (case, tag))| CaseBinding {
            index,
            tag,
            init: case.init,
        })
        .collect()
}
