use async_graphql::Request;
use feedbox::{
    MockImageStore, TokenService, build_schema,
    graphql::AppSchema,
    identity::{AuthUser, Identity},
    repository::RepositoryState,
    service,
    storage::ImageStoreState,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{MemoryRepository, TEST_SECRET};

struct TestSchema {
    schema: AppSchema,
    repo: Arc<MemoryRepository>,
}

fn test_schema() -> TestSchema {
    let repo = Arc::new(MemoryRepository::new());
    let images = Arc::new(MockImageStore::new()) as ImageStoreState;
    let tokens = TokenService::new(TEST_SECRET);
    let schema = build_schema(repo.clone() as RepositoryState, images, tokens);
    TestSchema { schema, repo }
}

/// Executes an operation with a fixed per-request identity, the way the HTTP
/// handler injects the middleware's result.
async fn exec(schema: &AppSchema, identity: Identity, query: &str) -> async_graphql::Response {
    schema.execute(Request::new(query).data(identity)).await
}

fn as_user(id: Uuid) -> Identity {
    Identity::User(AuthUser {
        id,
        email: "a@b.com".to_string(),
    })
}

/// Serializes the full response so error extensions can be inspected as JSON.
fn response_json(response: &async_graphql::Response) -> Value {
    serde_json::to_value(response).unwrap()
}

fn error_code(response: &async_graphql::Response) -> String {
    response_json(response)["errors"][0]["extensions"]["code"]
        .as_str()
        .expect("error must carry a code extension")
        .to_string()
}

async fn signup_user(repo: &MemoryRepository, email: &str) -> Uuid {
    service::signup(
        repo,
        feedbox::models::SignupRequest {
            email: email.to_string(),
            name: "Test User".to_string(),
            password: "secret123".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn create_post(repo: &MemoryRepository, owner: Uuid, title: &str) -> Uuid {
    service::create_post(
        repo,
        owner,
        feedbox::models::PostInput {
            title: title.to_string(),
            content: "Some content long enough".to_string(),
            image_path: "images/pic.png".to_string(),
        },
    )
    .await
    .unwrap()
    .0
    .id
}

#[tokio::test]
async fn create_user_is_open_to_anonymous_callers() {
    let t = test_schema();
    let resp = exec(
        &t.schema,
        Identity::Anonymous,
        r#"mutation {
            createUser(userInput: { email: "a@b.com", name: "Test User", password: "secret123" }) {
                email
                status
            }
        }"#,
    )
    .await;

    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["createUser"]["email"], "a@b.com");
    assert_eq!(data["createUser"]["status"], "I am new!");
}

#[tokio::test]
async fn create_user_validation_carries_field_errors() {
    let t = test_schema();
    let resp = exec(
        &t.schema,
        Identity::Anonymous,
        r#"mutation {
            createUser(userInput: { email: "nope", name: "X", password: "abc" }) { email }
        }"#,
    )
    .await;

    assert_eq!(error_code(&resp), "VALIDATION_FAILED");
    let errors = &response_json(&resp)["errors"][0]["extensions"]["errors"];
    assert_eq!(errors.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn duplicate_create_user_conflicts() {
    let t = test_schema();
    signup_user(&t.repo, "a@b.com").await;

    let resp = exec(
        &t.schema,
        Identity::Anonymous,
        r#"mutation {
            createUser(userInput: { email: "a@b.com", name: "Test User", password: "secret123" }) { email }
        }"#,
    )
    .await;

    assert_eq!(error_code(&resp), "CONFLICT");
}

#[tokio::test]
async fn login_query_issues_a_token() {
    let t = test_schema();
    let user_id = signup_user(&t.repo, "a@b.com").await;

    let resp = exec(
        &t.schema,
        Identity::Anonymous,
        r#"{ login(email: "a@b.com", password: "secret123") { token userId } }"#,
    )
    .await;

    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["login"]["userId"], json!(user_id));

    let token = data["login"]["token"].as_str().unwrap().to_string();
    let claims = TokenService::new(TEST_SECRET)
        .verify(&token)
        .expect("issued token must verify");
    assert_eq!(claims.sub, user_id);
}

#[tokio::test]
async fn login_with_bad_credentials_is_unauthenticated() {
    let t = test_schema();
    signup_user(&t.repo, "a@b.com").await;

    let resp = exec(
        &t.schema,
        Identity::Anonymous,
        r#"{ login(email: "a@b.com", password: "wrong-password") { token } }"#,
    )
    .await;
    assert_eq!(error_code(&resp), "UNAUTHENTICATED");
}

#[tokio::test]
async fn posts_query_requires_authentication() {
    let t = test_schema();

    let resp = exec(&t.schema, Identity::Anonymous, "{ posts { totalPosts } }").await;
    assert_eq!(error_code(&resp), "UNAUTHENTICATED");
}

#[tokio::test]
async fn posts_query_pages_newest_first() {
    let t = test_schema();
    let user_id = signup_user(&t.repo, "a@b.com").await;
    create_post(&t.repo, user_id, "Older post").await;
    let newest = create_post(&t.repo, user_id, "Newer post").await;
    create_post(&t.repo, user_id, "Newest post").await;

    let resp = exec(
        &t.schema,
        as_user(user_id),
        "{ posts(page: 2) { totalPosts posts { id title } } }",
    )
    .await;

    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["posts"]["totalPosts"], 3);
    // Page 1 holds the two newest, page 2 the one remaining.
    let page = data["posts"]["posts"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_ne!(page[0]["id"], json!(newest));
}

#[tokio::test]
async fn create_post_mutation_sets_the_creator_from_the_identity() {
    let t = test_schema();
    let user_id = signup_user(&t.repo, "a@b.com").await;

    let resp = exec(
        &t.schema,
        as_user(user_id),
        r#"mutation {
            createPost(postInput: {
                title: "A fresh post",
                content: "Long enough content",
                imagePath: "images/pic.png"
            }) { id title creator imagePath }
        }"#,
    )
    .await;

    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["createPost"]["creator"], json!(user_id));
    assert_eq!(data["createPost"]["imagePath"], "images/pic.png");
    assert_eq!(t.repo.user_post_ids(user_id).len(), 1);
}

#[tokio::test]
async fn update_post_by_non_owner_is_forbidden() {
    let t = test_schema();
    let alice = signup_user(&t.repo, "alice@b.com").await;
    let bob = signup_user(&t.repo, "bob@b.com").await;
    let post_id = create_post(&t.repo, alice, "Alice's post").await;

    let mutation = format!(
        r#"mutation {{
            updatePost(id: "{post_id}", postInput: {{
                title: "Hijacked title",
                content: "Hijacked content"
            }}) {{ id }}
        }}"#
    );

    let resp = exec(&t.schema, as_user(bob), &mutation).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");

    // The owner's same mutation goes through.
    let resp = exec(&t.schema, as_user(alice), &mutation).await;
    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["updatePost"]["id"], json!(post_id));
}

#[tokio::test]
async fn delete_post_mutation_enforces_ownership_then_deletes() {
    let t = test_schema();
    let alice = signup_user(&t.repo, "alice@b.com").await;
    let bob = signup_user(&t.repo, "bob@b.com").await;
    let post_id = create_post(&t.repo, alice, "Alice's post").await;

    let mutation = format!(r#"mutation {{ deletePost(id: "{post_id}") }}"#);

    let resp = exec(&t.schema, as_user(bob), &mutation).await;
    assert_eq!(error_code(&resp), "FORBIDDEN");

    let resp = exec(&t.schema, as_user(alice), &mutation).await;
    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    assert_eq!(resp.data.into_json().unwrap()["deletePost"], true);

    // A second delete finds nothing.
    let resp = exec(&t.schema, as_user(alice), &mutation).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");
}

#[tokio::test]
async fn post_query_reports_not_found() {
    let t = test_schema();
    let user_id = signup_user(&t.repo, "a@b.com").await;

    let query = format!(r#"{{ post(id: "{}") {{ id }} }}"#, Uuid::new_v4());
    let resp = exec(&t.schema, as_user(user_id), &query).await;
    assert_eq!(error_code(&resp), "NOT_FOUND");
}

#[tokio::test]
async fn password_hash_is_not_part_of_the_schema() {
    let t = test_schema();
    let sdl = t.schema.sdl();
    assert!(sdl.contains("type User"));
    assert!(!sdl.to_lowercase().contains("passwordhash"));
}
