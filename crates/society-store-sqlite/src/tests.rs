//! Integration tests for `SqliteStore` and `VisitorService` against an
//! in-memory database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use society_core::{
  ErrorKind, WorkflowError,
  role::{Actor, Role},
  service::{AccountService, ServiceError, VisitorService},
  store::SocietyStore,
  user::{AccountPatch, NewUser, User},
  visitor::{
    NewVisitor, VisitorPatch, VisitorQuery, VisitorScope, VisitorStatus,
  },
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_user(role: Role, flat: Option<&str>) -> NewUser {
  NewUser {
    first_name:    "Test".into(),
    last_name:     role.to_string(),
    email:         format!("{}@example.com", Uuid::new_v4()),
    role,
    flat_number:   flat.map(str::to_owned),
    is_active:     true,
    is_approved:   true,
    password_hash: "$argon2id$placeholder".into(),
  }
}

async fn add(s: &SqliteStore, role: Role, flat: Option<&str>) -> User {
  s.add_user(new_user(role, flat)).await.unwrap()
}

fn visitor(flat: &str, hours_ahead: i64) -> NewVisitor {
  NewVisitor {
    name: "Ravi".into(),
    phone: "9000000000".into(),
    purpose: Some("Delivery".into()),
    expected_time: Some(Utc::now() + Duration::hours(hours_ahead)),
    flat_to_visit: flat.into(),
    ..NewVisitor::default()
  }
}

fn approve() -> VisitorPatch {
  VisitorPatch { is_approved: Some(true), ..VisitorPatch::default() }
}

fn set_status(status: VisitorStatus) -> VisitorPatch {
  VisitorPatch { status: Some(status), ..VisitorPatch::default() }
}

fn workflow_err<E: std::error::Error>(err: ServiceError<E>) -> WorkflowError {
  match err {
    ServiceError::Workflow(w) => w,
    ServiceError::Store(e) => panic!("unexpected store error: {e}"),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;
  let user = add(&s, Role::Owner, Some("A-101")).await;

  let fetched = s.get_user(user.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, user.id);
  assert_eq!(fetched.role, Role::Owner);
  assert_eq!(fetched.flat_number.as_deref(), Some("A-101"));
  assert_eq!(fetched.password_hash, user.password_hash);

  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn email_lookup_is_case_insensitive_and_unique() {
  let s = store().await;
  let mut input = new_user(Role::Tenant, Some("A-101"));
  input.email = "Asha@Example.com".into();
  let user = s.add_user(input.clone()).await.unwrap();

  let found = s.find_user_by_email("asha@example.com").await.unwrap();
  assert_eq!(found.map(|u| u.id), Some(user.id));

  input.email = "asha@example.com".into();
  let err = s.add_user(input).await.unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateEmail(_)));
}

#[tokio::test]
async fn residents_of_flat_in_insertion_order() {
  let s = store().await;
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  add(&s, Role::Committee, Some("A-101")).await;
  add(&s, Role::Tenant, Some("B-202")).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;

  let residents = s.residents_of_flat("A-101").await.unwrap();
  let ids: Vec<_> = residents.iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![owner.id, tenant.id]);
}

#[tokio::test]
async fn people_resolves_known_ids_only() {
  let s = store().await;
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let people = s.people(&[owner.id, Uuid::new_v4()]).await.unwrap();
  assert_eq!(people.len(), 1);
  assert_eq!(people[0], owner.person_ref());
  assert!(s.people(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_users_by_approval_state() {
  let s = store().await;
  let approved = add(&s, Role::Owner, Some("A-101")).await;
  let mut input = new_user(Role::Tenant, Some("A-101"));
  input.is_approved = false;
  let pending = s.add_user(input).await.unwrap();

  let all = s.list_users(None).await.unwrap();
  assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![approved.id, pending.id]);

  let waiting = s.list_users(Some(false)).await.unwrap();
  assert_eq!(waiting.len(), 1);
  assert_eq!(waiting[0].id, pending.id);

  assert!(s.set_account_status(pending.id, true, true).await.unwrap());
  assert!(s.list_users(Some(false)).await.unwrap().is_empty());
  assert!(!s.set_account_status(Uuid::new_v4(), true, true).await.unwrap());
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_lifecycle() {
  let s = store().await;
  let user = add(&s, Role::Security, None).await;
  let now = Utc::now();

  s.create_session("live".into(), user.id, now + Duration::hours(1))
    .await
    .unwrap();
  s.create_session("stale".into(), user.id, now - Duration::hours(1))
    .await
    .unwrap();

  let resolved = s.resolve_session("live", now).await.unwrap();
  assert_eq!(resolved.map(|u| u.id), Some(user.id));
  assert!(s.resolve_session("stale", now).await.unwrap().is_none());
  assert!(s.resolve_session("unknown", now).await.unwrap().is_none());

  assert_eq!(s.purge_expired_sessions(now).await.unwrap(), 1);
  assert!(s.delete_session("live").await.unwrap());
  assert!(!s.delete_session("live").await.unwrap());
  assert!(s.resolve_session("live", now).await.unwrap().is_none());
}

// ─── Visitor rows ────────────────────────────────────────────────────────────

#[tokio::test]
async fn visitor_roundtrip_and_conditional_update() {
  let s = Arc::new(store().await);
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let view = service.create(&owner.actor(), visitor("A-101", 1)).await.unwrap();
  let stored = s.get_visitor(view.id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Scheduled);
  assert!(stored.is_approved);
  assert_eq!(stored.revision, 0);
  assert_eq!(stored.purpose.as_deref(), Some("Delivery"));

  let mut edited = stored.clone();
  edited.name = "Ravi K".into();
  assert!(s.update_visitor(&edited, 0).await.unwrap());
  // The stored revision moved on, so a second write from the same read fails.
  assert!(!s.update_visitor(&edited, 0).await.unwrap());

  let reread = s.get_visitor(view.id).await.unwrap().unwrap();
  assert_eq!(reread.name, "Ravi K");
  assert_eq!(reread.revision, 1);

  assert!(s.delete_visitor(view.id).await.unwrap());
  assert!(!s.delete_visitor(view.id).await.unwrap());
  assert!(s.get_visitor(view.id).await.unwrap().is_none());
}

#[tokio::test]
async fn listing_sorted_latest_first_and_filtered() {
  let s = Arc::new(store().await);
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let soon = service.create(&owner.actor(), visitor("A-101", 1)).await.unwrap();
  let later = service.create(&owner.actor(), visitor("A-101", 5)).await.unwrap();
  let middle = service.create(&owner.actor(), visitor("B-202", 3)).await.unwrap();

  let all = s
    .list_visitors(&VisitorQuery { scope: VisitorScope::All, status: None })
    .await
    .unwrap();
  let ids: Vec<_> = all.iter().map(|l| l.id).collect();
  assert_eq!(ids, vec![later.id, middle.id, soon.id]);

  let none_pending = s
    .list_visitors(&VisitorQuery {
      scope:  VisitorScope::All,
      status: Some(VisitorStatus::PendingApproval),
    })
    .await
    .unwrap();
  assert!(none_pending.is_empty());
}

// ─── Workflow through the service ────────────────────────────────────────────

#[tokio::test]
async fn walk_in_approved_then_checked_in() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  assert_eq!(created.status, VisitorStatus::PendingApproval);
  assert!(!created.is_approved);
  assert_eq!(created.needs_approval_from.as_ref().map(|p| p.id), Some(tenant.id));
  assert_eq!(created.logged_by.as_ref().map(|p| p.id), Some(guard.id));
  assert_eq!(created.scheduled_by.as_ref().map(|p| p.role), Some(Role::Security));

  let approved = service
    .update(&tenant.actor(), created.id, approve())
    .await
    .unwrap();
  assert_eq!(approved.status, VisitorStatus::Scheduled);
  assert_eq!(approved.approved_by.as_ref().map(|p| p.id), Some(tenant.id));
  assert!(approved.needs_approval_from.is_none());
  assert_eq!(approved.revision, 1);

  let inside = service
    .update(&guard.actor(), created.id, set_status(VisitorStatus::CheckedIn))
    .await
    .unwrap();
  assert_eq!(inside.status, VisitorStatus::CheckedIn);
  assert!(inside.check_in_time.is_some());
  assert!(inside.check_out_time.is_none());
}

#[tokio::test]
async fn walk_in_without_residents_fails() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let mut inactive = new_user(Role::Owner, Some("A-101"));
  inactive.is_active = false;
  s.add_user(inactive).await.unwrap();
  let service = VisitorService::new(Arc::clone(&s));

  let err = service
    .create(&guard.actor(), visitor("A-101", 0))
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::NoResidentFound);

  let all = s
    .list_visitors(&VisitorQuery { scope: VisitorScope::All, status: None })
    .await
    .unwrap();
  assert!(all.is_empty());
}

#[tokio::test]
async fn walk_in_prefers_tenant_over_owner() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  add(&s, Role::Owner, Some("A-101")).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  assert_eq!(created.needs_approval_from.map(|p| p.id), Some(tenant.id));
}

#[tokio::test]
async fn explicit_approver_is_validated() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  add(&s, Role::Tenant, Some("A-101")).await;
  let neighbour = add(&s, Role::Owner, Some("B-202")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let mut input = visitor("A-101", 0);
  input.needs_approval_from = Some(owner.id.to_string());
  let created = service.create(&guard.actor(), input).await.unwrap();
  assert_eq!(created.needs_approval_from.map(|p| p.id), Some(owner.id));

  let mut input = visitor("A-101", 0);
  input.needs_approval_from = Some(neighbour.id.to_string());
  let err = service.create(&guard.actor(), input).await.unwrap_err();
  let err = workflow_err(err);
  assert_eq!(err, WorkflowError::InvalidApprover);
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn pre_approved_walk_in_skips_approval() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let service = VisitorService::new(Arc::clone(&s));

  let mut input = visitor("Z-999", 0);
  input.status = Some(VisitorStatus::Scheduled);
  let created = service.create(&guard.actor(), input).await.unwrap();
  assert_eq!(created.status, VisitorStatus::Scheduled);
  assert!(created.is_approved);
  assert!(created.needs_approval_from.is_none());
}

#[tokio::test]
async fn check_in_refused_while_pending() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  add(&s, Role::Owner, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  let err = service
    .update(&guard.actor(), created.id, set_status(VisitorStatus::CheckedIn))
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::AwaitingApproval);

  let stored = s.get_visitor(created.id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::PendingApproval);
  assert!(stored.check_in_time.is_none());
  assert_eq!(stored.revision, 0);
}

#[tokio::test]
async fn second_approval_is_rejected() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  service.update(&tenant.actor(), created.id, approve()).await.unwrap();
  let err = service
    .update(&tenant.actor(), created.id, approve())
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::NotAwaitingApproval);
}

#[tokio::test]
async fn racing_approvals_apply_once() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  let actor = tenant.actor();
  let (a, b) = tokio::join!(
    service.update(&actor, created.id, approve()),
    service.update(&actor, created.id, approve()),
  );
  assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);

  let stored = s.get_visitor(created.id).await.unwrap().unwrap();
  assert_eq!(stored.revision, 1);
}

#[tokio::test]
async fn stale_read_surfaces_conflict() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let created = service.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  let stale = s.get_visitor(created.id).await.unwrap().unwrap();
  service.update(&tenant.actor(), created.id, approve()).await.unwrap();

  // A writer still holding the pre-approval copy cannot clobber the decision.
  let mut clobber = stale.clone();
  clobber.status = VisitorStatus::Rejected;
  clobber.needs_approval_from = None;
  assert!(!s.update_visitor(&clobber, stale.revision).await.unwrap());
  let stored = s.get_visitor(created.id).await.unwrap().unwrap();
  assert_eq!(stored.status, VisitorStatus::Scheduled);
}

#[tokio::test]
async fn residents_see_their_flat_only() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let other = add(&s, Role::Owner, Some("B-202")).await;
  let service = VisitorService::new(Arc::clone(&s));

  let by_owner = service.create(&owner.actor(), visitor("A-101", 1)).await.unwrap();
  let by_tenant = service.create(&tenant.actor(), visitor("A-101", 2)).await.unwrap();
  let walk_in = service.create(&guard.actor(), visitor("A-101", 3)).await.unwrap();
  let elsewhere = service.create(&other.actor(), visitor("B-202", 4)).await.unwrap();

  let ids = |views: Vec<society_core::visitor::VisitorView>| {
    views.into_iter().map(|v| v.id).collect::<Vec<_>>()
  };

  // The walk-in awaits the tenant, so only the tenant sees it.
  let tenant_view = ids(service.list(&tenant.actor(), None).await.unwrap());
  assert_eq!(tenant_view, vec![walk_in.id, by_tenant.id, by_owner.id]);

  let owner_view = ids(service.list(&owner.actor(), None).await.unwrap());
  assert_eq!(owner_view, vec![by_tenant.id, by_owner.id]);

  let other_view = ids(service.list(&other.actor(), None).await.unwrap());
  assert_eq!(other_view, vec![elsewhere.id]);

  let guard_view = ids(service.list(&guard.actor(), None).await.unwrap());
  assert_eq!(guard_view.len(), 4);

  let pending = ids(
    service
      .list(&guard.actor(), Some(VisitorStatus::PendingApproval))
      .await
      .unwrap(),
  );
  assert_eq!(pending, vec![walk_in.id]);
}

#[tokio::test]
async fn deletion_rules() {
  let s = Arc::new(store().await);
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let committee = add(&s, Role::Committee, None).await;
  let service = VisitorService::new(Arc::clone(&s));

  let first = service.create(&owner.actor(), visitor("A-101", 1)).await.unwrap();
  let second = service.create(&owner.actor(), visitor("A-101", 2)).await.unwrap();

  let err = service.delete(&tenant.actor(), first.id).await.unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::DeleteNotPermitted);

  service.delete(&owner.actor(), first.id).await.unwrap();
  service.delete(&committee.actor(), second.id).await.unwrap();

  let missing = Uuid::new_v4();
  let err = service.delete(&committee.actor(), missing).await.unwrap_err();
  let err = workflow_err(err);
  assert_eq!(err, WorkflowError::VisitorNotFound(missing));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn approvers_listed_tenant_first() {
  let s = Arc::new(store().await);
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let tenant = add(&s, Role::Tenant, Some("A-101")).await;
  let mut pending_signup = new_user(Role::Tenant, Some("A-101"));
  pending_signup.is_approved = false;
  s.add_user(pending_signup).await.unwrap();
  let service = VisitorService::new(Arc::clone(&s));

  let approvers = service
    .approvers_for_flat(&owner.actor(), "A-101")
    .await
    .unwrap();
  let ids: Vec<_> = approvers.iter().map(|p| p.id).collect();
  assert_eq!(ids, vec![tenant.id, owner.id]);

  let err = service
    .approvers_for_flat(&owner.actor(), "B-202")
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::ForeignFlat);
}

#[tokio::test]
async fn unknown_actor_cannot_log_visitors() {
  // Foreign keys tie every log to a real user.
  let s = Arc::new(store().await);
  let ghost = Actor { id: Uuid::new_v4(), role: Role::Admin, flat_number: None };
  let service = VisitorService::new(Arc::clone(&s));
  let err = service.create(&ghost, visitor("A-101", 0)).await.unwrap_err();
  assert!(matches!(err, ServiceError::Store(_)));
}

#[tokio::test]
async fn returning_visitor_gets_a_fresh_check_in() {
  let s = Arc::new(store().await);
  let guard = add(&s, Role::Security, None).await;
  let service = VisitorService::new(Arc::clone(&s));

  let mut input = visitor("A-101", 0);
  input.status = Some(VisitorStatus::CheckedIn);
  let created = service.create(&guard.actor(), input).await.unwrap();

  let err = service
    .update(&guard.actor(), created.id, set_status(VisitorStatus::CheckedIn))
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::AlreadyCheckedIn);

  let left = service
    .update(&guard.actor(), created.id, set_status(VisitorStatus::CheckedOut))
    .await
    .unwrap();
  assert!(left.check_out_time.is_some());

  let back = service
    .update(&guard.actor(), created.id, set_status(VisitorStatus::CheckedIn))
    .await
    .unwrap();
  assert_eq!(back.status, VisitorStatus::CheckedIn);
  assert!(back.check_out_time.is_none());
  assert!(back.check_in_time >= created.check_in_time);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn approved_account_becomes_an_approver() {
  let s = Arc::new(store().await);
  let committee = add(&s, Role::Committee, None).await;
  let guard = add(&s, Role::Security, None).await;
  let mut input = new_user(Role::Tenant, Some("A-101"));
  input.is_approved = false;
  let tenant = s.add_user(input).await.unwrap();

  let visitors = VisitorService::new(Arc::clone(&s));
  let accounts = AccountService::new(Arc::clone(&s));

  let err = visitors.create(&guard.actor(), visitor("A-101", 0)).await.unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::NoResidentFound);

  let pending = accounts.list(&committee.actor(), Some(false)).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].id, tenant.id);

  let patch = AccountPatch { is_approved: Some(true), ..AccountPatch::default() };
  let updated = accounts.set_status(&committee.actor(), tenant.id, patch).await.unwrap();
  assert!(updated.is_approved);
  assert!(s.get_user(tenant.id).await.unwrap().unwrap().is_approved);

  let created = visitors.create(&guard.actor(), visitor("A-101", 0)).await.unwrap();
  assert_eq!(created.needs_approval_from.map(|p| p.id), Some(tenant.id));
}

#[tokio::test]
async fn account_management_rules() {
  let s = Arc::new(store().await);
  let admin = add(&s, Role::Admin, None).await;
  let owner = add(&s, Role::Owner, Some("A-101")).await;
  let accounts = AccountService::new(Arc::clone(&s));
  let deactivate = AccountPatch { is_active: Some(false), ..AccountPatch::default() };

  let err = accounts.list(&owner.actor(), None).await.unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::AccountAdminOnly);

  let err = accounts
    .set_status(&owner.actor(), admin.id, deactivate.clone())
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::AccountAdminOnly);

  let missing = Uuid::new_v4();
  let err = accounts
    .set_status(&admin.actor(), missing, deactivate.clone())
    .await
    .unwrap_err();
  assert_eq!(workflow_err(err), WorkflowError::UserNotFound(missing));
  assert_eq!(WorkflowError::UserNotFound(missing).kind(), ErrorKind::NotFound);

  let updated = accounts.set_status(&admin.actor(), owner.id, deactivate).await.unwrap();
  assert!(!updated.is_active);
  assert!(!s.get_user(owner.id).await.unwrap().unwrap().can_approve_for("A-101"));
}
