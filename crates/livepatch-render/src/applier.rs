//! Delta application

use crate::target::RenderTarget;
use livepatch_artifact::{DeltaKind, DeltaOperation, DeltaUnit};

/// Applies delta units to a render target and keeps score
///
/// A locator that matches nothing is a soft failure: it is logged, counted
/// as a miss, and never raised. Only successful applications count as
/// applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeltaApplier {
    applied: usize,
    misses: usize,
}

impl DeltaApplier {
    /// Fresh counters
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one unit; `true` when the target changed
    pub fn apply<R: RenderTarget + ?Sized>(&mut self, unit: &DeltaUnit, target: &mut R) -> bool {
        let hit = match unit.kind() {
            DeltaKind::Style => {
                apply_style(unit, target);
                true
            }
            DeltaKind::Markup => apply_markup(unit, target),
            DeltaKind::Behavior => match unit.target() {
                Some(name) => {
                    target.define_behavior(name, unit.content());
                    true
                }
                None => false,
            },
        };

        if hit {
            self.applied += 1;
            tracing::debug!(delta = %unit.describe(), hash = %unit.hash().short(), "delta applied");
        } else {
            self.misses += 1;
            tracing::warn!(delta = %unit.describe(), "delta target not found, skipped");
        }
        hit
    }

    /// Units applied successfully
    #[inline]
    #[must_use]
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Units whose target matched nothing
    #[inline]
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Zero both counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn apply_style<R: RenderTarget + ?Sized>(unit: &DeltaUnit, target: &mut R) {
    match unit.operation() {
        DeltaOperation::Replace => target.replace_style(unit.content()),
        DeltaOperation::Append => {
            let mut css = target.style_text().to_owned();
            if !css.is_empty() && !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(unit.content());
            target.replace_style(&css);
        }
        DeltaOperation::Delete => target.replace_style(""),
    }
}

fn apply_markup<R: RenderTarget + ?Sized>(unit: &DeltaUnit, target: &mut R) -> bool {
    let Some(locator) = unit.target() else {
        return false;
    };
    let matched = match unit.operation() {
        DeltaOperation::Replace => target.replace_nodes(locator, unit.content()),
        DeltaOperation::Append => target.append_to_nodes(locator, unit.content()),
        DeltaOperation::Delete => target.remove_nodes(locator),
    };
    matched > 0
}
