use std::env;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use jobportal_backend::error::Error;
use jobportal_backend::models::application::ApplicationStatus;
use jobportal_backend::models::job::{CreateJobRequest, Job};
use jobportal_backend::models::user::{AuthUser, Role, User};
use jobportal_backend::AppState;

async fn setup() -> AppState {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("JWT_SECRET", "test_secret_key");
    let _ = jobportal_backend::config::init_config();

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("sqlite options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    AppState::new(pool)
}

async fn seed_user(state: &AppState, name: &str, role: Role) -> User {
    state
        .user_service
        .create_user(
            name.to_string(),
            format!("{}_{}@example.com", name, Uuid::new_v4()),
            role,
        )
        .await
        .expect("seed user")
}

fn as_actor(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

async fn seed_job(state: &AppState, provider: AuthUser, title: &str) -> Job {
    state
        .job_service
        .create_job(
            provider,
            CreateJobRequest {
                title: title.to_string(),
                description: Some("evening shift".to_string()),
                job_type: Some("part_time".to_string()),
                salary: Some("15/h".to_string()),
                city: Some("Coimbatore".to_string()),
            },
        )
        .await
        .expect("seed job")
}

#[tokio::test]
async fn scenario_a_mutual_acceptance_unlocks_one_chat() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "asha", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "priya", Role::Provider).await);
    let job = seed_job(&state, provider, "Barista").await;

    let app = state
        .application_service
        .apply(seeker, job.id, Some("I can start Monday".to_string()))
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::Pending);
    assert!(app.chat_id.is_none());

    let app = state
        .application_service
        .provider_accept(provider, app.id)
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::ProviderAccepted);
    assert!(app.chat_id.is_none());

    let app = state
        .application_service
        .seeker_accept(seeker, app.id)
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::BothAccepted);
    let chat_id = app.chat_id.expect("chat must be provisioned on mutual accept");

    let first = state
        .chat_service
        .ensure_channel(seeker, app.id)
        .await
        .unwrap();
    let second = state
        .chat_service
        .ensure_channel(provider, app.id)
        .await
        .unwrap();
    assert_eq!(first, chat_id);
    assert_eq!(second, chat_id);
}

#[tokio::test]
async fn scenario_b_rejected_applications_cannot_be_withdrawn() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "kumar", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "mala", Role::Provider).await);
    let job = seed_job(&state, provider, "Cashier").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();

    let app = state
        .application_service
        .provider_reject(provider, app.id)
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::Rejected);
    assert!(app.chat_id.is_none());

    let err = state
        .application_service
        .withdraw(seeker, app.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    // The record survives for history and can only be hidden.
    let app = state.application_service.hide(seeker, app.id).await.unwrap();
    assert!(app.seeker_hidden);
    assert_eq!(app.status, ApplicationStatus::Rejected);
    assert!(app.chat_id.is_none());
}

#[tokio::test]
async fn scenario_c_hiding_one_application_leaves_the_rest_alone() {
    let state = setup().await;
    let seeker_user = seed_user(&state, "devi", Role::Seeker).await;
    let provider_user = seed_user(&state, "ravi", Role::Provider).await;
    let seeker = as_actor(&seeker_user);
    let provider = as_actor(&provider_user);
    let job_one = seed_job(&state, provider, "Waiter").await;
    let job_two = seed_job(&state, provider, "Tutor").await;

    let mut apps = Vec::new();
    for job in [&job_one, &job_two] {
        let app = state
            .application_service
            .apply(seeker, job.id, None)
            .await
            .unwrap();
        state
            .application_service
            .seeker_accept(seeker, app.id)
            .await
            .unwrap();
        let app = state
            .application_service
            .provider_accept(provider, app.id)
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::BothAccepted);
        apps.push(app);
    }

    state
        .application_service
        .hide(seeker, apps[0].id)
        .await
        .unwrap();

    let visible = state
        .application_service
        .visible_for_seeker(seeker)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].application_id, apps[1].id);

    // The sibling record is untouched.
    let other = state.application_service.get(apps[1].id).await.unwrap();
    assert!(!other.seeker_hidden);
    assert!(!other.provider_hidden);
    assert_eq!(other.status, ApplicationStatus::BothAccepted);

    // The provider still sees the hidden one.
    let applicants = state
        .application_service
        .applicants_for_job(provider, job_one.id)
        .await
        .unwrap();
    assert_eq!(applicants.len(), 1);
    assert_eq!(applicants[0].application_id, apps[0].id);
}

#[tokio::test]
async fn scenario_d_concurrent_accepts_agree_on_one_channel() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "lata", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "vikram", Role::Provider).await);
    let job = seed_job(&state, provider, "Delivery").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();

    let seeker_side = {
        let svc = state.application_service.clone();
        let id = app.id;
        tokio::spawn(async move {
            for _ in 0..50 {
                match svc.seeker_accept(seeker, id).await {
                    Ok(_) => return,
                    Err(Error::ConcurrentModification) => continue,
                    Err(err) => panic!("seeker accept failed: {err}"),
                }
            }
            panic!("seeker accept never settled");
        })
    };
    let provider_side = {
        let svc = state.application_service.clone();
        let id = app.id;
        tokio::spawn(async move {
            for _ in 0..50 {
                match svc.provider_accept(provider, id).await {
                    Ok(_) => return,
                    Err(Error::ConcurrentModification) => continue,
                    Err(err) => panic!("provider accept failed: {err}"),
                }
            }
            panic!("provider accept never settled");
        })
    };
    seeker_side.await.unwrap();
    provider_side.await.unwrap();

    let app = state.application_service.get(app.id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::BothAccepted);
    let chat_id = app.chat_id.expect("exactly one channel");

    let from_seeker = state
        .chat_service
        .ensure_channel(seeker, app.id)
        .await
        .unwrap();
    let from_provider = state
        .chat_service
        .ensure_channel(provider, app.id)
        .await
        .unwrap();
    assert_eq!(from_seeker, chat_id);
    assert_eq!(from_provider, chat_id);
}

#[tokio::test]
async fn duplicate_apply_is_rejected() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "ram", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "sita", Role::Provider).await);
    let job = seed_job(&state, provider, "Gardener").await;

    state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();
    let err = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyApplied));
}

#[tokio::test]
async fn withdraw_before_acceptance_removes_the_record() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "anil", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "geeta", Role::Provider).await);
    let job = seed_job(&state, provider, "Packer").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();
    state
        .application_service
        .withdraw(seeker, app.id)
        .await
        .unwrap();

    let err = state.application_service.get(app.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let visible = state
        .application_service
        .visible_for_seeker(seeker)
        .await
        .unwrap();
    assert!(visible.is_empty());
}

#[tokio::test]
async fn hide_is_idempotent_and_one_sided() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "uma", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "raj", Role::Provider).await);
    let job = seed_job(&state, provider, "Cleaner").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();
    state
        .application_service
        .seeker_accept(seeker, app.id)
        .await
        .unwrap();
    let app = state
        .application_service
        .provider_accept(provider, app.id)
        .await
        .unwrap();
    let chat_id = app.chat_id;

    let first = state.application_service.hide(provider, app.id).await.unwrap();
    let second = state.application_service.hide(provider, app.id).await.unwrap();
    assert!(first.provider_hidden);
    assert!(second.provider_hidden);
    assert!(!second.seeker_hidden);
    assert_eq!(second.status, ApplicationStatus::BothAccepted);
    assert_eq!(second.chat_id, chat_id);

    // The seeker's list is unaffected by the provider's removal.
    let visible = state
        .application_service
        .visible_for_seeker(seeker)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].application_id, app.id);
}

#[tokio::test]
async fn unfinished_applications_cannot_be_hidden() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "mani", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "indra", Role::Provider).await);
    let job = seed_job(&state, provider, "Painter").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();

    let err = state.application_service.hide(seeker, app.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    // Provider hide stays locked through rejection too.
    let app = state
        .application_service
        .provider_reject(provider, app.id)
        .await
        .unwrap();
    let err = state.application_service.hide(provider, app.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));
}

#[tokio::test]
async fn outsiders_cannot_act_on_an_application() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "zara", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "omar", Role::Provider).await);
    let stranger = as_actor(&seed_user(&state, "thief", Role::Provider).await);
    let job = seed_job(&state, provider, "Courier").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();

    let err = state
        .application_service
        .provider_accept(stranger, app.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let other_seeker = as_actor(&seed_user(&state, "noor", Role::Seeker).await);
    let err = state
        .application_service
        .withdraw(other_seeker, app.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn providers_cannot_apply_and_seekers_cannot_post() {
    let state = setup().await;
    let provider = as_actor(&seed_user(&state, "mo", Role::Provider).await);
    let seeker = as_actor(&seed_user(&state, "li", Role::Seeker).await);
    let job = seed_job(&state, provider, "Security").await;

    let err = state
        .application_service
        .apply(provider, job.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = state
        .job_service
        .create_job(
            seeker,
            CreateJobRequest {
                title: "Not allowed".to_string(),
                description: None,
                job_type: None,
                salary: None,
                city: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn admin_records_ignore_hidden_flags() {
    let state = setup().await;
    let seeker = as_actor(&seed_user(&state, "esha", Role::Seeker).await);
    let provider = as_actor(&seed_user(&state, "dev", Role::Provider).await);
    let job = seed_job(&state, provider, "Librarian").await;

    let app = state
        .application_service
        .apply(seeker, job.id, None)
        .await
        .unwrap();
    state
        .application_service
        .seeker_accept(seeker, app.id)
        .await
        .unwrap();
    state
        .application_service
        .provider_accept(provider, app.id)
        .await
        .unwrap();
    state.application_service.hide(seeker, app.id).await.unwrap();
    state.application_service.hide(provider, app.id).await.unwrap();

    let records = state.application_service.all_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].application_id, app.id);
    assert_eq!(records[0].status, ApplicationStatus::BothAccepted);
}
