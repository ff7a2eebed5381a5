//! Property-based tests for Registry and Room membership
//!
//! Random join/leave sequences are applied to both the broker and
//! [`MembershipModel`]; membership, room existence and each session's room
//! reference must agree after every step.

use std::sync::Arc;

use proptest::prelude::*;
use roomcast_core::{Environment, MailboxReceiver, Registry, RoomConfig, Session, commands};
use roomcast_harness::{MembershipModel, MembershipOp, SimEnv};

const SESSIONS: usize = 6;
const ROOMS: usize = 4;

fn op_strategy() -> impl Strategy<Value = MembershipOp> {
    prop_oneof![
        3 => (0..SESSIONS, 0..ROOMS).prop_map(|(session, room)| MembershipOp::Join { session, room }),
        1 => (0..SESSIONS).prop_map(|session| MembershipOp::Leave { session }),
    ]
}

struct World {
    registry: Arc<Registry<SimEnv>>,
    sessions: Vec<(Arc<Session<SimEnv>>, MailboxReceiver)>,
}

impl World {
    fn new(seed: u64, config: RoomConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let registry = Registry::new(env.clone(), config);
        let sessions = (0..SESSIONS)
            .map(|i| Session::new(i as u64, format!("user{i}"), 1024, env.now()))
            .collect();
        Self { registry, sessions }
    }

    fn apply(&mut self, op: MembershipOp) {
        match op {
            MembershipOp::Join { session, room } => {
                let name = MembershipModel::room_name(room);
                commands::join(&self.sessions[session].0, &self.registry, &name);
            },
            MembershipOp::Leave { session } => self.sessions[session].0.detach(),
        }
        for (_, rx) in &mut self.sessions {
            rx.drain();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: membership always matches the model
    #[test]
    fn prop_membership_matches_model(
        seed in any::<u64>(),
        history in any::<bool>(),
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let config = if history { RoomConfig::default() } else { RoomConfig::without_history() };
        let mut world = World::new(seed, config);
        let mut model = MembershipModel::new();

        for op in ops {
            world.apply(op);
            model.apply(op);

            prop_assert_eq!(world.registry.room_names(), model.room_names());

            for room in 0..ROOMS {
                let expected: Vec<u64> = model.members(room).into_iter().map(|s| s as u64).collect();
                let actual = world
                    .registry
                    .room(&MembershipModel::room_name(room))
                    .map(|r| r.member_ids())
                    .unwrap_or_default();
                prop_assert_eq!(actual, expected);
            }

            for (i, (session, _)) in world.sessions.iter().enumerate() {
                let actual = session.room().map(|r| r.name().to_string());
                let expected = model.room_of(i).map(MembershipModel::room_name);
                prop_assert_eq!(actual, expected);
                prop_assert!(!session.is_closed());
            }
        }
    }

    /// Property: an emptied room comes back fresh
    #[test]
    fn prop_recreated_room_is_empty(
        seed in any::<u64>(),
        messages in prop::collection::vec("[a-z ]{1,16}", 0..10)
    ) {
        let mut world = World::new(seed, RoomConfig::default());
        world.apply(MembershipOp::Join { session: 0, room: 0 });

        let name = MembershipModel::room_name(0);
        let old = world.registry.room(&name).unwrap();
        for message in &messages {
            old.broadcast("user0", message);
        }
        world.apply(MembershipOp::Leave { session: 0 });
        prop_assert!(world.registry.room(&name).is_none());

        let fresh = world.registry.get_or_create(&name);
        prop_assert!(!Arc::ptr_eq(&old, &fresh));
        prop_assert_eq!(fresh.member_count(), 0);
        prop_assert!(fresh.history().is_empty());
    }

    /// Property: history never exceeds its limit and keeps the newest records
    #[test]
    fn prop_history_bounded(
        limit in 1usize..20,
        count in 0usize..50
    ) {
        let mut world = World::new(0, RoomConfig { history: true, history_limit: limit });
        world.apply(MembershipOp::Join { session: 0, room: 0 });
        let room = world.registry.room(&MembershipModel::room_name(0)).unwrap();

        for i in 0..count {
            room.broadcast("user0", &format!("m{i}"));
        }

        let history = room.history();
        prop_assert!(history.len() <= limit);
        if count > 0 {
            let newest = format!("user0|09:15|m{}", count - 1);
            prop_assert_eq!(history.last(), Some(&newest));
        }
    }
}
