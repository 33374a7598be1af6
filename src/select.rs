// src/select.rs
//! Diversity-constrained selection from a scored candidate pool.

use std::collections::HashMap;

use crate::news::Candidate;

/// Stable ordering used everywhere downstream: score descending, then
/// recency descending.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.published.cmp(&a.published))
    });
}

/// Pick up to `limit` items from sorted `candidates`, capping how many may
/// come from one source or one category. Works on a pool of `4 × limit` so
/// the caps have room to diversify; when the caps leave the list short, they
/// are relaxed and the remainder filled in sorted order.
pub fn select_diverse(
    candidates: &[Candidate],
    limit: usize,
    per_source: usize,
    per_category: usize,
) -> Vec<Candidate> {
    if limit == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let pool = &candidates[..candidates.len().min(limit * 4)];

    let mut out: Vec<Candidate> = Vec::with_capacity(limit);
    let mut src_count: HashMap<&str, usize> = HashMap::new();
    let mut cat_count: HashMap<&str, usize> = HashMap::new();

    // Greedy pass under the caps.
    for c in pool {
        if out.len() >= limit {
            break;
        }
        if c.link.is_empty() {
            continue;
        }
        if per_source > 0 && src_count.get(c.source_name.as_str()).copied().unwrap_or(0) >= per_source {
            continue;
        }
        if per_category > 0 && cat_count.get(c.category.as_str()).copied().unwrap_or(0) >= per_category {
            continue;
        }
        *src_count.entry(c.source_name.as_str()).or_insert(0) += 1;
        *cat_count.entry(c.category.as_str()).or_insert(0) += 1;
        out.push(c.clone());
    }

    // Relax the caps and fill, never re-accepting a link.
    if out.len() < limit {
        for c in pool {
            if out.len() >= limit {
                break;
            }
            if c.link.is_empty() || out.iter().any(|x| x.link == c.link) {
                continue;
            }
            out.push(c.clone());
        }
    }

    sort_candidates(&mut out);
    out
}
