use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::app::auth::AuthService;
use crate::app::comments::CommentService;
use crate::app::feed::FeedService;
use crate::app::forms::{
    BoundForm, CommentForm, FormErrors, ImageChange, LoginForm, PostForm, SignupForm, ValidImage,
    NON_FIELD_ERRORS,
};
use crate::app::groups::GroupService;
use crate::app::images::{self, ImageService};
use crate::app::posts::{PostFilter, PostService};
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::domain::comment::Comment;
use crate::domain::group::Group;
use crate::domain::page::Page;
use crate::domain::post::Post;
use crate::domain::user::PublicUser;
use crate::http::auth::{session_cookie, session_removal};
use crate::http::error::is_unique_violation;
use crate::http::form::Form;
use crate::http::redirect;
use crate::http::render::{render, Empty};
use crate::http::{AdminToken, AppError, AuthUser};
use crate::AppState;

const INDEX_TEMPLATE: &str = "posts/index.html";
const GROUP_TEMPLATE: &str = "posts/group.html";
const PROFILE_TEMPLATE: &str = "posts/profile.html";
const POST_TEMPLATE: &str = "posts/post.html";
const POST_FORM_TEMPLATE: &str = "posts/new_post.html";
const FOLLOW_TEMPLATE: &str = "posts/follow.html";
const SIGNUP_TEMPLATE: &str = "users/signup.html";
const LOGIN_TEMPLATE: &str = "registration/login.html";

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

fn parse_post_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::not_found("post not found"))
}

fn with_image_url(state: &AppState, mut post: Post) -> Post {
    post.image_url = post
        .image
        .as_deref()
        .and_then(|key| images::image_url(state.media_url.as_deref(), key));
    post
}

fn with_image_urls(state: &AppState, page: Page<Post>) -> Page<Post> {
    page.map(|post| with_image_url(state, post))
}

async fn store_image(state: &AppState, image: &ValidImage) -> Result<String, AppError> {
    ImageService::new(state.storage.clone())
        .store(image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to store image");
            AppError::internal("failed to store image")
        })
}

async fn load_groups(state: &AppState) -> Result<Vec<Group>, AppError> {
    GroupService::new(state.db.clone())
        .list_all()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list groups");
            AppError::internal("failed to list groups")
        })
}

async fn load_profile(state: &AppState, username: &str) -> Result<PublicUser, AppError> {
    let profile = UserService::new(state.db.clone())
        .get_profile(username)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, username = %username, "failed to fetch profile");
            AppError::internal("failed to fetch profile")
        })?;

    profile.ok_or_else(|| AppError::not_found("user not found"))
}

async fn load_authored_post(
    state: &AppState,
    username: &str,
    post_id: &str,
) -> Result<Post, AppError> {
    let post_id = parse_post_id(post_id)?;
    let post = PostService::new(state.db.clone())
        .get_authored_post(username, post_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?;

    post.ok_or_else(|| AppError::not_found("post not found"))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

pub async fn not_found() -> AppError {
    AppError::not_found("page not found")
}

pub async fn about_author() -> Response {
    render("about/author.html", Empty {})
}

pub async fn about_tech() -> Response {
    render("about/tech.html", Empty {})
}

// Listings

#[derive(Serialize)]
pub struct IndexContext {
    pub page: Page<Post>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let service = FeedService::new(
        state.db.clone(),
        state.cache.clone(),
        state.index_cache_ttl_seconds,
    );
    let page = service.index(query.page.as_deref()).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list posts");
        AppError::internal("failed to list posts")
    })?;

    Ok(render(
        INDEX_TEMPLATE,
        IndexContext {
            page: with_image_urls(&state, page),
        },
    ))
}

#[derive(Serialize)]
pub struct GroupContext {
    pub group: Group,
    pub page: Page<Post>,
}

pub async fn group_posts(
    Path(slug): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let group = GroupService::new(state.db.clone())
        .get_by_slug(&slug)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, slug = %slug, "failed to fetch group");
            AppError::internal("failed to fetch group")
        })?
        .ok_or_else(|| AppError::not_found("group not found"))?;

    let page = PostService::new(state.db.clone())
        .list(PostFilter::Group(group.id), query.page.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, group_id = group.id, "failed to list group posts");
            AppError::internal("failed to list group posts")
        })?;

    Ok(render(
        GROUP_TEMPLATE,
        GroupContext {
            group,
            page: with_image_urls(&state, page),
        },
    ))
}

#[derive(Serialize)]
pub struct ProfileContext {
    pub author: PublicUser,
    pub page: Page<Post>,
    pub following: bool,
}

pub async fn profile(
    Path(username): Path<String>,
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let author = load_profile(&state, &username).await?;

    let page = PostService::new(state.db.clone())
        .list(PostFilter::Author(author.id), query.page.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = %author.id, "failed to list user posts");
            AppError::internal("failed to list user posts")
        })?;

    let following = match viewer {
        Some(viewer) => SocialService::new(state.db.clone())
            .is_following(viewer.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %viewer.user_id, author_id = %author.id, "failed to fetch follow status");
                AppError::internal("failed to fetch follow status")
            })?,
        None => false,
    };

    Ok(render(
        PROFILE_TEMPLATE,
        ProfileContext {
            author,
            page: with_image_urls(&state, page),
            following,
        },
    ))
}

#[derive(Serialize)]
pub struct PostContext {
    pub author: PublicUser,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub form: BoundForm,
}

async fn post_context(
    state: &AppState,
    username: &str,
    post: Post,
    form: BoundForm,
) -> Result<PostContext, AppError> {
    let author = load_profile(state, username).await?;
    let comments = CommentService::new(state.db.clone())
        .list_for_post(post.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post.id, "failed to list comments");
            AppError::internal("failed to list comments")
        })?;

    Ok(PostContext {
        author,
        post: with_image_url(state, post),
        comments,
        form,
    })
}

pub async fn post_view(
    Path((username, post_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let post = load_authored_post(&state, &username, &post_id).await?;
    let context = post_context(&state, &username, post, BoundForm::empty()).await?;

    Ok(render(POST_TEMPLATE, context))
}

pub async fn follow_index(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let service = FeedService::new(
        state.db.clone(),
        state.cache.clone(),
        state.index_cache_ttl_seconds,
    );
    let page = service
        .follow_feed(auth.user_id, query.page.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch follow feed");
            AppError::internal("failed to fetch follow feed")
        })?;

    Ok(render(
        FOLLOW_TEMPLATE,
        IndexContext {
            page: with_image_urls(&state, page),
        },
    ))
}

// Post create / edit

#[derive(Serialize)]
pub struct PostFormContext {
    pub form: BoundForm,
    pub groups: Vec<Group>,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

pub async fn new_post_form(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let groups = load_groups(&state).await?;

    Ok(render(
        POST_FORM_TEMPLATE,
        PostFormContext {
            form: BoundForm::empty(),
            groups,
            is_edit: false,
            post: None,
        },
    ))
}

pub async fn new_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Form(data): Form,
) -> Result<Response, AppError> {
    let groups = load_groups(&state).await?;
    let cleaned = match PostForm::clean(&data, &groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return Ok(render(
                POST_FORM_TEMPLATE,
                PostFormContext {
                    form: BoundForm::invalid(&data, PostForm::FIELDS, errors),
                    groups,
                    is_edit: false,
                    post: None,
                },
            ))
        }
    };

    let image = match &cleaned.image {
        ImageChange::Replace(image) => Some(store_image(&state, image).await?),
        ImageChange::Keep | ImageChange::Clear => None,
    };

    let post = PostService::new(state.db.clone())
        .create_post(auth.user_id, cleaned.text, cleaned.group_id, image)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    tracing::info!(post_id = post.id, author_id = %auth.user_id, "post created");
    Ok(redirect::found("/"))
}

pub async fn post_edit_form(
    auth: AuthUser,
    Path((username, post_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let post = load_authored_post(&state, &username, &post_id).await?;
    if post.author_id != auth.user_id {
        return Ok(redirect::found(redirect::post_url(
            &post.author_username,
            post.id,
        )));
    }

    let groups = load_groups(&state).await?;
    let form = BoundForm::initial([
        ("text", post.text.clone()),
        (
            "group",
            post.group_id().map(|id| id.to_string()).unwrap_or_default(),
        ),
    ]);

    Ok(render(
        POST_FORM_TEMPLATE,
        PostFormContext {
            form,
            groups,
            is_edit: true,
            post: Some(with_image_url(&state, post)),
        },
    ))
}

pub async fn post_edit(
    auth: AuthUser,
    Path((username, post_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Form(data): Form,
) -> Result<Response, AppError> {
    let post = load_authored_post(&state, &username, &post_id).await?;
    let detail_url = redirect::post_url(&post.author_username, post.id);
    if post.author_id != auth.user_id {
        tracing::warn!(post_id = post.id, user_id = %auth.user_id, "edit attempt by non-author");
        return Ok(redirect::found(detail_url));
    }

    let groups = load_groups(&state).await?;
    let cleaned = match PostForm::clean(&data, &groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return Ok(render(
                POST_FORM_TEMPLATE,
                PostFormContext {
                    form: BoundForm::invalid(&data, PostForm::FIELDS, errors),
                    groups,
                    is_edit: true,
                    post: Some(with_image_url(&state, post)),
                },
            ))
        }
    };

    let (image, uploaded) = match &cleaned.image {
        ImageChange::Keep => (post.image.clone(), None),
        ImageChange::Clear => (None, None),
        ImageChange::Replace(image) => {
            let key = store_image(&state, image).await?;
            (Some(key.clone()), Some(key))
        }
    };

    let updated = PostService::new(state.db.clone())
        .update_post(post.id, auth.user_id, cleaned.text, cleaned.group_id, image)
        .await;

    if !matches!(updated, Ok(Some(_))) {
        if let Some(key) = &uploaded {
            tracing::warn!(key = %key, post_id = post.id, "uploaded image not attached to a post");
        }
    }
    match updated {
        Ok(Some(_)) => {}
        Ok(None) => return Err(AppError::not_found("post not found")),
        Err(err) => {
            tracing::error!(error = ?err, post_id = post.id, "failed to update post");
            return Err(AppError::internal("failed to update post"));
        }
    }

    tracing::info!(post_id = post.id, author_id = %auth.user_id, "post updated");
    Ok(redirect::found(detail_url))
}

// Comments

pub async fn add_comment(
    auth: AuthUser,
    Path((username, post_id)): Path<(String, String)>,
    State(state): State<AppState>,
    Form(data): Form,
) -> Result<Response, AppError> {
    let post = load_authored_post(&state, &username, &post_id).await?;

    let cleaned = match CommentForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let form = BoundForm::invalid(&data, CommentForm::FIELDS, errors);
            let context = post_context(&state, &username, post, form).await?;
            return Ok(render(POST_TEMPLATE, context));
        }
    };

    let comment = CommentService::new(state.db.clone())
        .add_comment(post.id, auth.user_id, cleaned.text)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = post.id, user_id = %auth.user_id, "failed to add comment");
            AppError::internal("failed to add comment")
        })?;

    tracing::info!(comment_id = comment.id, post_id = post.id, "comment added");
    Ok(redirect::found(redirect::post_url(
        &post.author_username,
        post.id,
    )))
}

// Follow graph

pub async fn profile_follow(
    auth: AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let author = load_profile(&state, &username).await?;

    if author.id != auth.user_id {
        let created = SocialService::new(state.db.clone())
            .follow(auth.user_id, author.id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %auth.user_id, author_id = %author.id, "failed to follow author");
                AppError::internal("failed to follow author")
            })?;
        if created.is_some() {
            tracing::info!(user_id = %auth.user_id, author_id = %author.id, "follow created");
        }
    }

    Ok(redirect::found(redirect::profile_url(&author.username)))
}

pub async fn profile_unfollow(
    auth: AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let author = load_profile(&state, &username).await?;

    let removed = SocialService::new(state.db.clone())
        .unfollow(auth.user_id, author.id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, author_id = %author.id, "failed to unfollow author");
            AppError::internal("failed to unfollow author")
        })?;
    if removed {
        tracing::info!(user_id = %auth.user_id, author_id = %author.id, "follow removed");
    }

    Ok(redirect::found(redirect::profile_url(&author.username)))
}

// Accounts

#[derive(Serialize)]
pub struct SignupContext {
    pub form: BoundForm,
}

pub async fn signup_form() -> Response {
    render(
        SIGNUP_TEMPLATE,
        SignupContext {
            form: BoundForm::empty(),
        },
    )
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(data): Form,
) -> Result<Response, AppError> {
    let invalid = |errors: FormErrors| {
        render(
            SIGNUP_TEMPLATE,
            SignupContext {
                form: BoundForm::invalid(&data, SignupForm::FIELDS, errors),
            },
        )
    };

    let cleaned = match SignupForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(invalid(errors)),
    };

    let service = AuthService::new(
        state.db.clone(),
        state.session_key,
        state.session_ttl_hours,
    );
    let user = match service
        .signup(
            cleaned.username,
            cleaned.email,
            cleaned.display_name,
            cleaned.password,
        )
        .await
    {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err, "users_username_key") => {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            return Ok(invalid(errors));
        }
        Err(err) if is_unique_violation(&err, "users_email_key") => {
            let mut errors = FormErrors::default();
            errors.add("email", "A user with that email already exists.");
            return Ok(invalid(errors));
        }
        Err(err) => {
            tracing::error!(error = ?err, "failed to create user");
            return Err(AppError::internal("failed to create user"));
        }
    };

    let session = service.issue_session(user.id).map_err(|err| {
        tracing::error!(error = ?err, user_id = %user.id, "failed to issue session");
        AppError::internal("failed to issue session")
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user signed up");
    let jar = jar.add(session_cookie(session.token, service.session_ttl_seconds()));
    Ok((jar, redirect::found("/")).into_response())
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct LoginContext {
    pub form: BoundForm,
    pub next: Option<String>,
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Response {
    render(
        LOGIN_TEMPLATE,
        LoginContext {
            form: BoundForm::empty(),
            next: query.next,
        },
    )
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(data): Form,
) -> Result<Response, AppError> {
    let next = data.cleaned("next");
    let invalid = |errors: FormErrors| {
        render(
            LOGIN_TEMPLATE,
            LoginContext {
                form: BoundForm::invalid(&data, LoginForm::FIELDS, errors),
                next: next.clone(),
            },
        )
    };

    let cleaned = match LoginForm::clean(&data) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(invalid(errors)),
    };

    let service = AuthService::new(
        state.db.clone(),
        state.session_key,
        state.session_ttl_hours,
    );
    let session = service
        .login(&cleaned.username, &cleaned.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    let session = match session {
        Some(session) => session,
        None => {
            let mut errors = FormErrors::default();
            errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
            return Ok(invalid(errors));
        }
    };

    let location = next
        .as_deref()
        .filter(|next| redirect::is_safe_next(next))
        .unwrap_or("/")
        .to_string();

    tracing::info!(user_id = %session.user_id, "user logged in");
    let jar = jar.add(session_cookie(session.token, service.session_ttl_seconds()));
    Ok((jar, redirect::found(location)).into_response())
}

pub async fn logout(jar: CookieJar) -> Response {
    (jar.remove(session_removal()), redirect::found("/")).into_response()
}

// Administration

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

pub async fn create_group(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    const MAX_TITLE_LEN: usize = 200;
    const MAX_SLUG_LEN: usize = 50;

    let title = payload.title.trim().to_string();
    let slug = payload.slug.trim().to_string();

    if title.is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 200 characters"));
    }
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(AppError::bad_request("slug must be 1 to 50 characters"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "slug may contain only letters, numbers, hyphens and underscores",
        ));
    }

    let group = GroupService::new(state.db.clone())
        .create_group(title, slug, payload.description)
        .await
        .map_err(|err| {
            if is_unique_violation(&err, "groups_slug_key") {
                return AppError::conflict("slug already taken");
            }
            tracing::error!(error = ?err, "failed to create group");
            AppError::internal("failed to create group")
        })?;

    tracing::info!(group_id = group.id, slug = %group.slug, "group created");
    Ok(Json(group))
}

#[derive(Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

pub async fn clear_cache(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> Result<Json<ClearCacheResponse>, AppError> {
    let removed = state.cache.clear().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to clear page cache");
        AppError::internal("failed to clear page cache")
    })?;

    Ok(Json(ClearCacheResponse { removed }))
}
