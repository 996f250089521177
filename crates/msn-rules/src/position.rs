use crate::{FattyAcid, IntensityRule, RuleContext};

/// Merges the chain positions proposed by position rules into one chain index per backbone slot
///
/// Slots claimed for different chains are left undefined. The same chain may fill several slots, but only as many as
/// it occurs in `chains`; if more slots are claimed for it than that, none of its claims can be trusted.
#[must_use]
pub fn merge_positions(chains: &[FattyAcid], rules: &[IntensityRule]) -> Vec<Option<usize>> {
    let mut proposals: Vec<Vec<&FattyAcid>> = vec![Vec::new(); chains.len()];
    for rule in rules {
        let RuleContext::Position(context) = rule.context() else {
            continue;
        };
        for fa in context.chains() {
            if let Some(position) = rule.position_by_fa(fa)
                && let Some(slot) = position.checked_sub(1).and_then(|slot| proposals.get_mut(slot))
                && !slot.contains(&fa)
            {
                slot.push(fa);
            }
        }
    }

    let mut positions = vec![None; chains.len()];
    let mut poisoned: Vec<&FattyAcid> = Vec::new();
    for (slot, candidates) in proposals.iter().enumerate() {
        let &[fa] = candidates.as_slice() else {
            continue;
        };
        if poisoned.contains(&fa) {
            continue;
        }
        let free = (0..chains.len()).find(|&i| chains[i] == *fa && !positions.contains(&Some(i)));
        if let Some(index) = free {
            positions[slot] = Some(index);
        } else {
            for position in &mut positions {
                if position.is_some_and(|i| chains[i] == *fa) {
                    *position = None;
                }
            }
            poisoned.push(fa);
        }
    }
    positions
}

/// The only slot and the only chain left without a position, if exactly one of each remains
#[must_use]
pub fn last_unassigned(positions: &[Option<usize>]) -> Option<(usize, usize)> {
    let free_slots: Vec<_> = (0..positions.len()).filter(|&slot| positions[slot].is_none()).collect();
    let free_chains: Vec<_> = (0..positions.len()).filter(|i| !positions.contains(&Some(*i))).collect();
    match (&free_slots[..], &free_chains[..]) {
        ([slot], [chain]) => Some((*slot, *chain)),
        _ => None,
    }
}

// Module Tests ========================================================================================================
