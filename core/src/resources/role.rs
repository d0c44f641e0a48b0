use serde::de::IgnoredAny;

use crate::client::RestClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::route::Route;
use crate::types::{CreateRole, Role, RoleList};

const LIST: Route = Route::get("/roles");
const CREATE: Route = Route::post("/roles/create").expect(&[201]);
// Backend versions disagree on 200 vs 204 here.
const DELETE: Route = Route::delete("/roles/{id}/delete").expect(&[204, 200]);

pub struct RoleClient<'a, T> {
    rest: &'a RestClient<T>,
}

impl<'a, T: Transport> RoleClient<'a, T> {
    pub(crate) fn new(rest: &'a RestClient<T>) -> Self {
        Self { rest }
    }

    pub fn list(&self) -> Result<RoleList, ApiError> {
        self.rest
            .execute(&LIST.endpoint()?, None::<&()>)
            .map(|envelope| envelope.payload)
    }

    pub fn create(&self, role: &CreateRole) -> Result<Role, ApiError> {
        self.rest
            .execute(&CREATE.endpoint()?, Some(role))
            .map(|envelope| envelope.payload)
    }

    pub fn delete(&self, role_id: i64) -> Result<(), ApiError> {
        let id = role_id.to_string();
        // A 200 may carry `{}` or `null`; only the status and error field matter.
        self.rest
            .execute::<(), IgnoredAny>(&DELETE.bind(&[("id", &id)])?, None)
            .map(|_| ())
    }
}
