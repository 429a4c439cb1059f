//! Caller identity forwarded by the gateway.
//!
//! Every request must carry `x-actor-id`, `x-actor-name`, `x-actor-role`
//! and `x-company-id`. The middleware turns them into an engine
//! [`Context`] stored in the request extensions.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
    typed_header::TypedHeaderRejection,
};
use engine::{ActorRole, Context};

static ACTOR_ID: HeaderName = HeaderName::from_static("x-actor-id");
static ACTOR_NAME: HeaderName = HeaderName::from_static("x-actor-name");
static ACTOR_ROLE: HeaderName = HeaderName::from_static("x-actor-role");
static COMPANY_ID: HeaderName = HeaderName::from_static("x-company-id");

fn decode_text<'i, I>(values: &mut I) -> Result<String, AxumError>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let value = values.next().ok_or_else(AxumError::invalid)?;
    let Ok(value) = value.to_str() else {
        return Err(AxumError::invalid());
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(AxumError::invalid());
    }
    Ok(value.to_string())
}

fn encode_text<E: Extend<HeaderValue>>(value: &str, values: &mut E) {
    match HeaderValue::from_str(value) {
        Ok(value) => values.extend(std::iter::once(value)),
        Err(_) => tracing::error!("failed to encode actor header"),
    }
}

macro_rules! text_header {
    ($name:ident, $header:ident) => {
        #[derive(Debug)]
        pub struct $name(pub String);

        impl Header for $name {
            fn name() -> &'static HeaderName {
                &$header
            }

            fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
            where
                Self: Sized,
                I: Iterator<Item = &'i HeaderValue>,
            {
                decode_text(values).map($name)
            }

            fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
                encode_text(&self.0, values);
            }
        }
    };
}

text_header!(ActorId, ACTOR_ID);
text_header!(ActorName, ACTOR_NAME);
text_header!(CompanyId, COMPANY_ID);

/// `x-actor-role`: `manager` or `super_admin`.
#[derive(Debug)]
pub struct ActorRoleHeader(pub ActorRole);

impl Header for ActorRoleHeader {
    fn name() -> &'static HeaderName {
        &ACTOR_ROLE
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = decode_text(values)?;
        ActorRole::try_from(value.as_str())
            .map(ActorRoleHeader)
            .map_err(|_| AxumError::invalid())
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        encode_text(self.0.as_str(), values);
    }
}

type Extracted<T> = Result<TypedHeader<T>, TypedHeaderRejection>;

pub async fn actor(
    actor_id: Extracted<ActorId>,
    actor_name: Extracted<ActorName>,
    role: Extracted<ActorRoleHeader>,
    company_id: Extracted<CompanyId>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (
        Ok(TypedHeader(ActorId(actor_id))),
        Ok(TypedHeader(ActorName(actor_name))),
        Ok(TypedHeader(ActorRoleHeader(role))),
        Ok(TypedHeader(CompanyId(company_id))),
    ) = (actor_id, actor_name, role, company_id)
    else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let ctx = Context::new(actor_id, actor_name, role, company_id);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
