//! Gillespie direct-method pass over a gathered event pool.
//!
//! Selection is rate-proportional roulette over the pool. A selected event
//! fires with probability `1 - exp(-rate * dt)` and leaves the pool either
//! way, so each event is considered at most once per pass. After a firing
//! the pool is kept consistent per policy: eager filtering drops every
//! event touching a consumed educt immediately, lazy rejection leaves them
//! in place and discards them when drawn. Both select among valid events
//! with the same rate-proportional distribution.

use std::collections::HashSet;

use rand::prelude::*;
use rand_distr::UnitSphere;

use rxd_kernel::{NeighborList, ParticleStore};
use rxd_math::Vec3;
use rxd_model::{EventPoolPolicy, ReactionKind, System};

use crate::event::{gather_events, NewParticle, ReactionEvent, ReactionOutcome};
use crate::ReactionScheduler;

/// Runs one pass over `events`, consuming the pool.
pub fn run_pass(
    system: &System,
    store: &ParticleStore,
    mut events: Vec<ReactionEvent>,
    policy: EventPoolPolicy,
    rng: &mut StdRng,
) -> ReactionOutcome {
    let mut outcome = ReactionOutcome::default();
    match policy {
        EventPoolPolicy::EagerFilter => {
            run_eager(system, store, &mut events, rng, &mut outcome)
        }
        EventPoolPolicy::LazyReject => run_lazy(system, store, &mut events, rng, &mut outcome),
    }
    outcome
}

/// Cumulative-rate roulette. `None` only when `x` overshoots the pool's
/// total rate, which requires a stale draw bound.
fn select(events: &[ReactionEvent], x: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    for (k, event) in events.iter().enumerate() {
        cumulative += event.rate;
        if x < cumulative {
            return Some(k);
        }
    }
    None
}

fn fires(rate: f64, dt: f64, rng: &mut StdRng) -> bool {
    rng.gen::<f64>() < 1.0 - (-rate * dt).exp()
}

fn run_eager(
    system: &System,
    store: &ParticleStore,
    events: &mut Vec<ReactionEvent>,
    rng: &mut StdRng,
    outcome: &mut ReactionOutcome,
) {
    let dt = system.context.dt;
    loop {
        let alpha: f64 = events.iter().map(|e| e.rate).sum();
        if alpha <= 0.0 {
            break;
        }
        let x = rng.gen_range(0.0..alpha);
        let k = match select(events, x) {
            Some(k) => k,
            None => continue,
        };
        let event = events.swap_remove(k);
        if fires(event.rate, dt, rng) {
            let first_consumed = outcome.deactivate.len();
            execute_event(system, store, &event, rng, outcome);
            let consumed = &outcome.deactivate[first_consumed..];
            events.retain(|e| !consumed.iter().any(|&c| e.involves(c)));
        }
    }
}

fn run_lazy(
    system: &System,
    store: &ParticleStore,
    events: &mut Vec<ReactionEvent>,
    rng: &mut StdRng,
    outcome: &mut ReactionOutcome,
) {
    let dt = system.context.dt;
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut alpha: f64 = events.iter().map(|e| e.rate).sum();
    while !events.is_empty() && alpha > 0.0 {
        let x = rng.gen_range(0.0..alpha);
        let k = match select(events, x) {
            Some(k) => k,
            None => {
                // the stale bound overshot the live pool
                alpha = events.iter().map(|e| e.rate).sum();
                if alpha <= 0.0 {
                    break;
                }
                continue;
            }
        };
        let event = events.swap_remove(k);
        if consumed.contains(&event.idx1) || consumed.contains(&event.idx2) {
            continue;
        }
        if fires(event.rate, dt, rng) {
            let first_consumed = outcome.deactivate.len();
            execute_event(system, store, &event, rng, outcome);
            consumed.extend(outcome.deactivate[first_consumed..].iter().copied());
        }
    }
}

/// Records the educt deactivations and product placements of one firing.
/// Product positions follow the registered geometry and are wrapped into
/// the box.
fn execute_event(
    system: &System,
    store: &ParticleStore,
    event: &ReactionEvent,
    rng: &mut StdRng,
    outcome: &mut ReactionOutcome,
) {
    let reaction = match event.order {
        1 => &system.reactions.order1_by_type(event.type1)[event.reaction_index],
        _ => &system.reactions.order2_by_types(event.type1, event.type2)[event.reaction_index],
    };
    let context = &system.context;
    match reaction.kind {
        ReactionKind::Conversion { to, .. } => {
            outcome.deactivate.push(event.idx1);
            let mut position = store.position(event.idx1);
            context.fix_position(&mut position);
            outcome.products.push(NewParticle { type_id: to, position });
        }
        ReactionKind::Decay { .. } => {
            outcome.deactivate.push(event.idx1);
        }
        ReactionKind::Fission {
            to,
            product_distance,
            weight1,
            weight2,
            ..
        } => {
            outcome.deactivate.push(event.idx1);
            let origin = store.position(event.idx1);
            let direction: [f64; 3] = UnitSphere.sample(rng);
            let normal = Vec3::new(direction[0], direction[1], direction[2]);
            let mut first = origin + weight1 * product_distance * normal;
            let mut second = origin - weight2 * product_distance * normal;
            context.fix_position(&mut first);
            context.fix_position(&mut second);
            outcome.products.push(NewParticle {
                type_id: to.0,
                position: first,
            });
            outcome.products.push(NewParticle {
                type_id: to.1,
                position: second,
            });
        }
        ReactionKind::Fusion {
            from, to, weight1, ..
        } => {
            // order the educts so the first matches the registered pair
            let (first, second) = if event.type1 == from.0 {
                (event.idx1, event.idx2)
            } else {
                (event.idx2, event.idx1)
            };
            outcome.deactivate.push(event.idx1);
            outcome.deactivate.push(event.idx2);
            let anchor = store.position(first);
            let diff = context.shortest_difference(&anchor, &store.position(second));
            let mut position = anchor + weight1 * diff;
            context.fix_position(&mut position);
            outcome.products.push(NewParticle {
                type_id: to,
                position,
            });
        }
        ReactionKind::Enzymatic { to, catalyst, .. } => {
            let converted = if event.type1 == catalyst {
                event.idx2
            } else {
                event.idx1
            };
            outcome.deactivate.push(converted);
            let mut position = store.position(converted);
            context.fix_position(&mut position);
            outcome.products.push(NewParticle { type_id: to, position });
        }
    }
}

/// Whole-box Gillespie sweep, the baseline the parallel scheduler must
/// match.
#[derive(Debug)]
pub struct SerialGillespie {
    rng: StdRng,
    policy: EventPoolPolicy,
}

impl SerialGillespie {
    pub fn new(seed: u64, policy: EventPoolPolicy) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            policy,
        }
    }
}

impl ReactionScheduler for SerialGillespie {
    fn pass(
        &mut self,
        system: &System,
        store: &ParticleStore,
        list: &NeighborList,
    ) -> ReactionOutcome {
        let live: Vec<usize> = (0..store.deactivated_index())
            .filter(|&i| !store.is_deactivated(i))
            .collect();
        let events = gather_events(system, store, list, &live);
        let n_events = events.len();
        let outcome = run_pass(system, store, events, self.policy, &mut self.rng);
        log::trace!(
            "serial reaction pass: {} events, {} deactivated, {} products",
            n_events,
            outcome.deactivate.len(),
            outcome.products.len()
        );
        outcome
    }
}
