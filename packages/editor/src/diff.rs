//! Unified diff classified line by line

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Added,
    Removed,
    Context,
    /// File headers and hunk markers
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
}

/// Diff between the stored document and the working copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffView {
    lines: Vec<DiffLine>,
}

impl DiffView {
    pub fn parse(diff: &str) -> Self {
        let lines = diff
            .lines()
            .map(|line| DiffLine {
                kind: classify(line),
                text: line.to_string(),
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn added(&self) -> usize {
        self.count(DiffLineKind::Added)
    }

    pub fn removed(&self) -> usize {
        self.count(DiffLineKind::Removed)
    }

    /// No line would change
    pub fn is_unchanged(&self) -> bool {
        self.added() == 0 && self.removed() == 0
    }

    fn count(&self, kind: DiffLineKind) -> usize {
        self.lines.iter().filter(|l| l.kind == kind).count()
    }
}

fn classify(line: &str) -> DiffLineKind {
    if line.starts_with("+++")
        || line.starts_with("---")
        || line.starts_with("@@")
        || line.starts_with("diff ")
        || line.starts_with("index ")
    {
        DiffLineKind::Header
    } else if line.starts_with('+') {
        DiffLineKind::Added
    } else if line.starts_with('-') {
        DiffLineKind::Removed
    } else {
        DiffLineKind::Context
    }
}

impl fmt::Display for DiffView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unified_diff() {
        let view = DiffView::parse(
            "--- a/content/a.md\n+++ b/content/a.md\n@@ -1,2 +1,2 @@\n title\n-old\n+new\n+more\n",
        );

        let kinds: Vec<DiffLineKind> = view.lines().iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Header,
                DiffLineKind::Context,
                DiffLineKind::Removed,
                DiffLineKind::Added,
                DiffLineKind::Added,
            ]
        );
        assert_eq!(view.added(), 2);
        assert_eq!(view.removed(), 1);
        assert!(!view.is_unchanged());
    }

    #[test]
    fn test_empty_diff() {
        let view = DiffView::parse("");
        assert!(view.is_unchanged());
        assert_eq!(view.to_string(), "");
    }
}
