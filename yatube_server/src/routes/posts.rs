use axum::{
    extract::{rejection::FormRejection, Multipart, Path, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use yatube_core::{
    entity::prelude::{PostModel, UserModel},
    forms::{CommentForm, FormErrors, PostForm, Upload},
    ids::GroupId,
    Yatube,
};

use crate::{
    error::AppError,
    extractors::AuthUser,
    routes::{found, parse_post_id, post_url, profile_url},
};

const POST_FORM_FIELDS: [&str; 3] = ["text", "group", "image"];

#[derive(Serialize)]
pub struct GroupChoice {
    pub id: GroupId,
    pub title: String,
}

/// Submitted (or current) values, echoed back on redisplay.
#[derive(Serialize, Default)]
pub struct PostFormValues {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

/// A post form as shown to the user: blank, bound to an existing post, or
/// bound to a rejected submission with its errors.
#[derive(Serialize)]
pub struct PostFormPage {
    pub is_edit: bool,
    pub fields: [&'static str; 3],
    pub values: PostFormValues,
    pub groups: Vec<GroupChoice>,
    pub errors: FormErrors,
}

impl PostFormPage {
    async fn render(
        yatube: &Yatube,
        is_edit: bool,
        values: PostFormValues,
        errors: FormErrors,
    ) -> Result<Self, AppError> {
        let groups = yatube
            .groups
            .list_groups()
            .await?
            .into_iter()
            .map(|group| GroupChoice {
                id: group.id,
                title: group.title,
            })
            .collect();

        Ok(Self {
            is_edit,
            fields: POST_FORM_FIELDS,
            values,
            groups,
            errors,
        })
    }
}

fn values_of_post(post: &PostModel) -> PostFormValues {
    PostFormValues {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()),
        image: post.image.clone(),
    }
}

fn values_of_submission(form: &PostForm, current_image: Option<String>) -> PostFormValues {
    PostFormValues {
        text: form.text.clone(),
        group: form.group.clone(),
        image: current_image,
    }
}

/// Reads `text`, `group` and `image` parts. Anything else, `author`
/// included, is ignored.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("text") => form.text = field.text().await?,
            Some("group") => form.group = Some(field.text().await?),
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                form.image = Some(Upload { filename, data });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Loads the post and makes sure `user` wrote it. Anyone else is sent
/// back to the post.
async fn post_for_edit(
    yatube: &Yatube,
    raw_id: &str,
    user: &UserModel,
) -> Result<PostModel, AppError> {
    let post_id = parse_post_id(raw_id)?;
    let post = yatube.posts.get_post(post_id).await?;

    if post.author_id != user.id {
        tracing::info!(%post_id, user_id = %user.id, "edit refused: not the author");
        return Err(AppError::Forbidden {
            redirect_to: post_url(post_id),
        });
    }

    Ok(post)
}

pub async fn create_form(
    State(yatube): State<Yatube>,
    AuthUser(_user): AuthUser,
) -> Result<Json<PostFormPage>, AppError> {
    let page =
        PostFormPage::render(&yatube, false, PostFormValues::default(), FormErrors::default())
            .await?;
    Ok(Json(page))
}

pub async fn create_post(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_post_form(multipart).await?;

    match form.clean(&yatube.db).await? {
        Ok(cleaned) => {
            yatube.posts.create_post(user.id, cleaned).await?;
            Ok(found(&profile_url(&user.username)))
        }
        Err(errors) => {
            let values = values_of_submission(&form, None);
            let page = PostFormPage::render(&yatube, false, values, errors).await?;
            Ok(Json(page).into_response())
        }
    }
}

pub async fn edit_form(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Json<PostFormPage>, AppError> {
    let post = post_for_edit(&yatube, &post_id, &user).await?;

    let page =
        PostFormPage::render(&yatube, true, values_of_post(&post), FormErrors::default()).await?;
    Ok(Json(page))
}

pub async fn edit_post(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post = post_for_edit(&yatube, &post_id, &user).await?;
    let form = read_post_form(multipart).await?;

    match form.clean(&yatube.db).await? {
        Ok(cleaned) => {
            yatube.posts.update_post(post.id, user.id, cleaned).await?;
            Ok(found(&post_url(post.id)))
        }
        Err(errors) => {
            let values = values_of_submission(&form, post.image);
            let page = PostFormPage::render(&yatube, true, values, errors).await?;
            Ok(Json(page).into_response())
        }
    }
}

/// Comments are only ever posted; a GET just goes back to the post.
pub async fn comment_redirect(
    State(yatube): State<Yatube>,
    AuthUser(_user): AuthUser,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post = yatube.posts.get_post(parse_post_id(&post_id)?).await?;
    Ok(found(&post_url(post.id)))
}

pub async fn add_comment(
    State(yatube): State<Yatube>,
    AuthUser(user): AuthUser,
    Path(post_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Result<Response, AppError> {
    let post = yatube.posts.get_post(parse_post_id(&post_id)?).await?;

    let form = form.map(|Form(form)| form).unwrap_or_default();
    match form.clean() {
        Ok(text) => {
            yatube.comments.add_comment(post.id, user.id, text).await?;
        }
        Err(errors) => {
            tracing::debug!(post_id = %post.id, ?errors, "comment rejected");
        }
    }

    Ok(found(&post_url(post.id)))
}
