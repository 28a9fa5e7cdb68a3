use character_votes_shared::types::{Catalog, Rankings, ScoreMap, ScoredCharacter, Vote};

/// Sums every vote into a net score per character key.
///
/// Keys absent from the catalog are kept; they simply never show up in the rankings.
pub fn compute_scores(votes: &[Vote]) -> ScoreMap {
    let mut scores = ScoreMap::new();
    for vote in votes {
        *scores.entry(vote.character_key.clone()).or_insert(0) += vote.vote_type.weight();
    }
    scores
}

/// Joins every catalog character with its score and partitions by sign.
///
/// Characters without votes score zero. Ties keep catalog order.
pub fn rank(catalog: &Catalog, scores: &ScoreMap) -> Rankings {
    let mut rankings = Rankings::default();

    for (key, character) in catalog.iter() {
        let scored = ScoredCharacter {
            character: character.clone(),
            score: scores.get(key).copied().unwrap_or(0),
        };
        match scored.score {
            s if s > 0 => rankings.beloved.push(scored),
            s if s < 0 => rankings.hated.push(scored),
            _ => rankings.neutral.push(scored),
        }
    }

    rankings.beloved.sort_by(|a, b| b.score.cmp(&a.score));
    rankings.hated.sort_by_key(|c| c.score);
    rankings
}

pub fn compute_rankings(catalog: &Catalog, votes: &[Vote]) -> Rankings {
    rank(catalog, &compute_scores(votes))
}
