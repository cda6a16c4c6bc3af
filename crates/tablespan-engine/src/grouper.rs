//! Grouping of detected titles into consecutive-page repetition runs.

use tablespan_core::TitleOccurrence;

/// One repetition run: a maximal sequence of occurrences sharing the same
/// canonical title on strictly consecutive pages.
///
/// `indices` point into the title slice the run was built from, in page
/// order. A run of length 1 is a title that does not repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepetitionRun {
    pub indices: Vec<usize>,
}

impl RepetitionRun {
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether the run spans more than one page and therefore needs the
    /// position suffix.
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.indices.len() > 1
    }
}

/// Partition titles (pre-sorted by page, then in-page offset) into
/// repetition runs.
///
/// Single forward scan over contiguous indices: a run absorbs the
/// immediately following occurrences, and only those, while they carry the
/// identical canonical string and their page number continues the run
/// exactly (`start_page + run_length`). Any other occurrence in between
/// ends the run, so interleaved titles (A, B, A, B across two pages) stay
/// four singletons, and pages `[2, 3, 5]` yield a run of two and a run of
/// one. Every input index lands in exactly one run.
#[must_use]
pub fn group_runs(titles: &[TitleOccurrence]) -> Vec<RepetitionRun> {
    let mut runs = Vec::new();
    let mut i = 0;

    while i < titles.len() {
        let mut count = 1;
        while i + count < titles.len()
            && titles[i + count].full_title == titles[i].full_title
            && u64::from(titles[i + count].page) == u64::from(titles[i].page) + count as u64
        {
            count += 1;
        }
        runs.push(RepetitionRun {
            indices: (i..i + count).collect(),
        });
        i += count;
    }

    runs
}
