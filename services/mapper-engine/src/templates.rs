//! Predefined mapper templates offered through "add builtin".
//!
//! Each template is an ordinary mapper submission minus the client id. Adding
//! one to a client goes through the same validation as any other create.
use crate::model::NewMapper;
use crate::transform::builtin;

struct Template {
    name: &'static str,
    type_id: &'static str,
    config: &'static [(&'static str, &'static str)],
}

const ALL_TARGETS: [(&str, &str); 3] = [
    ("id.token.claim", "true"),
    ("access.token.claim", "true"),
    ("userinfo.token.claim", "true"),
];

macro_rules! property_template {
    ($name:literal, $property:literal, $claim:literal, $json:literal) => {
        Template {
            name: $name,
            type_id: builtin::USER_PROPERTY,
            config: &[
                ("user.attribute", $property),
                ("claim.name", $claim),
                ("jsonType.label", $json),
                ALL_TARGETS[0],
                ALL_TARGETS[1],
                ALL_TARGETS[2],
            ],
        }
    };
}

const TEMPLATES: &[Template] = &[
    property_template!("username", "username", "preferred_username", "String"),
    property_template!("email", "email", "email", "String"),
    property_template!("email verified", "emailVerified", "email_verified", "boolean"),
    property_template!("given name", "firstName", "given_name", "String"),
    property_template!("family name", "lastName", "family_name", "String"),
    Template {
        name: "full name",
        type_id: builtin::FULL_NAME,
        config: &ALL_TARGETS,
    },
    Template {
        name: "locale",
        type_id: builtin::USER_ATTRIBUTE,
        config: &[
            ("user.attribute", "locale"),
            ("claim.name", "locale"),
            ("jsonType.label", "String"),
            ALL_TARGETS[0],
            ALL_TARGETS[1],
            ALL_TARGETS[2],
        ],
    },
    Template {
        name: "groups",
        type_id: builtin::GROUP_MEMBERSHIP,
        config: &[("full.path", "true"), ("claim.name", "groups")],
    },
];

/// Names of every available template, in catalog order.
pub fn names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|template| template.name)
}

/// Instantiate the template called `name` for `client_id`.
pub fn instantiate(name: &str, client_id: &str) -> Option<NewMapper> {
    let template = TEMPLATES.iter().find(|template| template.name == name)?;
    Some(
        template
            .config
            .iter()
            .fold(
                NewMapper::new(client_id, template.name, template.type_id),
                |mapper, (key, value)| mapper.with_config(*key, *value),
            ),
    )
}
