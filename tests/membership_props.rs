use std::collections::HashSet;

use clubhub::{
    auth::{
        extractors::AuthUser,
        repo_types::{NewUser, Role},
    },
    clubs::{membership, services, ClubForm},
    error::AppError,
    AppState,
};
use proptest::prelude::*;
use proptest::test_runner::Config;
use tokio::{runtime::Builder, task::JoinSet};
use uuid::Uuid;

const USERS: usize = 4;
const CLUBS: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Op {
    Join(usize, usize),
    Leave(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 0..CLUBS).prop_map(|(u, c)| Op::Join(u, c)),
        (0..USERS, 0..CLUBS).prop_map(|(u, c)| Op::Leave(u, c)),
    ]
}

struct World {
    state: AppState,
    users: Vec<Uuid>,
    clubs: Vec<Uuid>,
}

/// User 0 is the admin that creates every club.
async fn world() -> Result<World, TestCaseError> {
    let state = AppState::fake();
    let mut users = Vec::new();
    for i in 0..USERS {
        let role = if i == 0 { Role::Admin } else { Role::Member };
        let user = state
            .users
            .create(NewUser {
                name: format!("user-{i}"),
                email: format!("user-{i}@x.io"),
                password_hash: "h".into(),
                role,
            })
            .await
            .unwrap();
        users.push(user.id);
    }

    let admin = AuthUser {
        user_id: users[0],
        role: Role::Admin,
    };
    let mut clubs = Vec::new();
    for i in 0..CLUBS {
        let form = ClubForm {
            name: Some(format!("club-{i}")),
            description: Some("d".into()),
            category: Some("Others".into()),
            image: None,
        };
        let club = services::create_club(&state, admin, form).await.unwrap();
        prop_assert!(club.members.contains(&club.created_by));
        clubs.push(club.id);
    }

    Ok(World {
        state,
        users,
        clubs,
    })
}

async fn run(state: &AppState, user_id: Uuid, club_id: Uuid, op: Op) -> Result<(), AppError> {
    match op {
        Op::Join(..) => membership::join(state, user_id, club_id).await,
        Op::Leave(..) => membership::leave(state, user_id, club_id).await,
    }
}

fn ids(w: &World, op: Op) -> (Uuid, Uuid) {
    let (Op::Join(u, c) | Op::Leave(u, c)) = op;
    (w.users[u], w.clubs[c])
}

/// Both sides agree and neither list holds duplicates. Returns the relation.
async fn check_relation(w: &World) -> Result<HashSet<(Uuid, Uuid)>, TestCaseError> {
    let mut from_clubs = HashSet::new();
    for &club_id in &w.clubs {
        let club = w.state.clubs.find_by_id(club_id).await.unwrap().unwrap();
        let distinct: HashSet<_> = club.members.iter().collect();
        prop_assert_eq!(distinct.len(), club.members.len(), "duplicate in members of {}", club_id);
        from_clubs.extend(club.members.iter().map(|&u| (u, club_id)));
    }

    let mut from_users = HashSet::new();
    for &user_id in &w.users {
        let user = w.state.users.find_by_id(user_id).await.unwrap().unwrap();
        let distinct: HashSet<_> = user.clubs_joined.iter().collect();
        prop_assert_eq!(
            distinct.len(),
            user.clubs_joined.len(),
            "duplicate in clubsJoined of {}",
            user_id
        );
        from_users.extend(user.clubs_joined.iter().map(|&c| (user_id, c)));
    }

    prop_assert_eq!(&from_clubs, &from_users);
    Ok(from_clubs)
}

proptest! {
    #![proptest_config(Config::with_cases(64))]

    #[test]
    fn sequential_join_leave_matches_set_model(ops in prop::collection::vec(op(), 0..40)) {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let w = world().await?;
            let mut model: HashSet<(Uuid, Uuid)> =
                w.clubs.iter().map(|&c| (w.users[0], c)).collect();
            prop_assert_eq!(&check_relation(&w).await?, &model);

            for op in ops {
                let (user_id, club_id) = ids(&w, op);
                let res = run(&w.state, user_id, club_id, op).await;
                match op {
                    Op::Join(..) if model.insert((user_id, club_id)) => {
                        prop_assert!(res.is_ok(), "{:?} failed: {:?}", op, res);
                    }
                    Op::Join(..) => {
                        prop_assert!(matches!(res, Err(AppError::AlreadyMember)), "{:?}", op);
                    }
                    Op::Leave(..) => {
                        model.remove(&(user_id, club_id));
                        prop_assert!(res.is_ok(), "{:?} failed: {:?}", op, res);
                    }
                }
                prop_assert_eq!(&check_relation(&w).await?, &model);
            }
            Ok(())
        })?;
    }

    #[test]
    fn concurrent_join_leave_keeps_both_sides_equal(ops in prop::collection::vec(op(), 1..32)) {
        let rt = Builder::new_multi_thread().worker_threads(4).enable_all().build().unwrap();
        rt.block_on(async {
            let w = world().await?;

            let mut tasks = JoinSet::new();
            for op in ops {
                let (user_id, club_id) = ids(&w, op);
                let state = w.state.clone();
                tasks.spawn(async move { (op, run(&state, user_id, club_id, op).await) });
            }
            while let Some(joined) = tasks.join_next().await {
                let (op, res) = joined.unwrap();
                match (op, res) {
                    (_, Ok(())) | (Op::Join(..), Err(AppError::AlreadyMember)) => {}
                    (op, Err(e)) => prop_assert!(false, "{:?} failed: {}", op, e),
                }
            }

            check_relation(&w).await?;
            Ok(())
        })?;
    }
}
