use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Object, Result as GraphQLResult, Schema,
    http::GraphiQLSource,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, response::Html};
use uuid::Uuid;

use crate::{
    identity::Identity,
    models::{AuthPayload, Post, PostInput, PostPage, SignupRequest, UpdatePostInput, User},
    repository::RepositoryState,
    service,
    storage::ImageStoreState,
    token::TokenService,
};

/// The query/mutation surface. Shares every authorization rule with the REST
/// surface by delegating to the same service layer; only the error encoding
/// differs (extension codes instead of HTTP statuses). Every resolver maps
/// its `ApiError` through `ErrorExtensions::extend` so the code and per-field
/// errors survive into the response extensions.
pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(
    repo: RepositoryState,
    images: ImageStoreState,
    tokens: TokenService,
) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(repo)
        .data(images)
        .data(tokens)
        .finish()
}

/// Pulls the per-request identity out of the context and runs the
/// authentication check.
fn require_auth(ctx: &Context<'_>) -> GraphQLResult<crate::identity::AuthUser> {
    let identity = ctx.data_unchecked::<Identity>();
    identity
        .require()
        .map(Clone::clone)
        .map_err(|e| e.extend())
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Authenticates and returns a signed identity token. The only read that
    /// does not require authentication.
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GraphQLResult<AuthPayload> {
        let repo = ctx.data_unchecked::<RepositoryState>();
        let tokens = ctx.data_unchecked::<TokenService>();
        service::login(repo.as_ref(), tokens, &email, &password)
            .await
            .map_err(|e| e.extend())
    }

    /// One page of posts, newest first. Requires authentication.
    async fn posts(&self, ctx: &Context<'_>, page: Option<u64>) -> GraphQLResult<PostPage> {
        require_auth(ctx)?;
        let repo = ctx.data_unchecked::<RepositoryState>();
        service::list_posts(repo.as_ref(), page.unwrap_or(1))
            .await
            .map_err(|e| e.extend())
    }

    /// A single post by id. Requires authentication.
    async fn post(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<Post> {
        require_auth(ctx)?;
        let repo = ctx.data_unchecked::<RepositoryState>();
        service::get_post(repo.as_ref(), id)
            .await
            .map_err(|e| e.extend())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Registers a new user. Open to anonymous callers.
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        user_input: SignupRequest,
    ) -> GraphQLResult<User> {
        let repo = ctx.data_unchecked::<RepositoryState>();
        service::signup(repo.as_ref(), user_input)
            .await
            .map_err(|e| e.extend())
    }

    async fn create_post(&self, ctx: &Context<'_>, post_input: PostInput) -> GraphQLResult<Post> {
        let user = require_auth(ctx)?;
        let repo = ctx.data_unchecked::<RepositoryState>();
        let (post, _creator) = service::create_post(repo.as_ref(), user.id, post_input)
            .await
            .map_err(|e| e.extend())?;
        Ok(post)
    }

    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        post_input: UpdatePostInput,
    ) -> GraphQLResult<Post> {
        let user = require_auth(ctx)?;
        let repo = ctx.data_unchecked::<RepositoryState>();
        let images = ctx.data_unchecked::<ImageStoreState>();
        service::update_post(repo.as_ref(), images, id, user.id, post_input)
            .await
            .map_err(|e| e.extend())
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: Uuid) -> GraphQLResult<bool> {
        let user = require_auth(ctx)?;
        let repo = ctx.data_unchecked::<RepositoryState>();
        let images = ctx.data_unchecked::<ImageStoreState>();
        service::delete_post(repo.as_ref(), images, id, user.id)
            .await
            .map_err(|e| e.extend())?;
        Ok(true)
    }
}

/// Axum handler for POST /graphql. The identity resolved by the middleware is
/// injected into the execution context so resolvers see exactly what REST
/// handlers see.
pub async fn graphql_handler(
    State(schema): State<AppSchema>,
    identity: Identity,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(identity)).await.into()
}

/// Interactive GraphiQL playground, the query-surface counterpart of the
/// Swagger UI.
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
