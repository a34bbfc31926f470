//! Built-in OpenID Connect mapper types.
//!
//! # Purpose
//! One [`BuiltinMapper`] variant per built-in type id. Each variant knows its
//! descriptor (configuration schema) and implements [`MapperTransform`].
//!
//! # Key invariants
//! - Role-producing types write to the access token only, under
//!   `realm_access.roles` or `resource_access.<client>.roles`.
//! - Claim-producing types write only to the targets enabled by their
//!   `id.token.claim` / `access.token.claim` / `userinfo.token.claim` flags.
//! - Missing per-request data (session note, attribute, property) yields no
//!   contribution rather than an error.
use super::{MapperConfig, MapperTransform, TransformContext, TransformResult};
use crate::model::{MapperTypeDescriptor, PropertySpec, Protocol};
use async_trait::async_trait;
use mapper_claims::{
    ClaimContribution, ClaimPath, ClaimTarget, RoleRef, RoleScope, coerce,
};
use serde_json::Value;
use std::collections::BTreeMap;

pub const HARDCODED_ROLE: &str = "oidc-hardcoded-role-mapper";
pub const HARDCODED_CLAIM: &str = "oidc-hardcoded-claim-mapper";
pub const USER_SESSION_NOTE: &str = "oidc-usersessionmodel-note-mapper";
pub const ROLE_NAME: &str = "oidc-role-name-mapper";
pub const FULL_NAME: &str = "oidc-full-name-mapper";
pub const USER_ATTRIBUTE: &str = "oidc-usermodel-attribute-mapper";
pub const USER_PROPERTY: &str = "oidc-usermodel-property-mapper";
pub const GROUP_MEMBERSHIP: &str = "oidc-group-membership-mapper";
pub const REALM_ROLE: &str = "oidc-usermodel-realm-role-mapper";
pub const CLIENT_ROLE: &str = "oidc-usermodel-client-role-mapper";
pub const AUDIENCE: &str = "oidc-audience-mapper";

const CLIENT_ID_PLACEHOLDER: &str = "${client_id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinMapper {
    HardcodedRole,
    HardcodedClaim,
    UserSessionNote,
    RoleName,
    FullName,
    UserAttribute,
    UserProperty,
    GroupMembership,
    RealmRole,
    ClientRole,
    Audience,
}

impl BuiltinMapper {
    /// Registration order.
    pub const ALL: [BuiltinMapper; 11] = [
        BuiltinMapper::HardcodedRole,
        BuiltinMapper::HardcodedClaim,
        BuiltinMapper::UserSessionNote,
        BuiltinMapper::RoleName,
        BuiltinMapper::FullName,
        BuiltinMapper::UserAttribute,
        BuiltinMapper::UserProperty,
        BuiltinMapper::GroupMembership,
        BuiltinMapper::RealmRole,
        BuiltinMapper::ClientRole,
        BuiltinMapper::Audience,
    ];

    pub fn type_id(&self) -> &'static str {
        match self {
            BuiltinMapper::HardcodedRole => HARDCODED_ROLE,
            BuiltinMapper::HardcodedClaim => HARDCODED_CLAIM,
            BuiltinMapper::UserSessionNote => USER_SESSION_NOTE,
            BuiltinMapper::RoleName => ROLE_NAME,
            BuiltinMapper::FullName => FULL_NAME,
            BuiltinMapper::UserAttribute => USER_ATTRIBUTE,
            BuiltinMapper::UserProperty => USER_PROPERTY,
            BuiltinMapper::GroupMembership => GROUP_MEMBERSHIP,
            BuiltinMapper::RealmRole => REALM_ROLE,
            BuiltinMapper::ClientRole => CLIENT_ROLE,
            BuiltinMapper::Audience => AUDIENCE,
        }
    }

    pub fn descriptor(&self) -> MapperTypeDescriptor {
        let base = |name: &str| MapperTypeDescriptor::new(self.type_id(), name, Protocol::Oidc);
        match self {
            BuiltinMapper::HardcodedRole => {
                base("Hardcoded Role").property(PropertySpec::role("role").required())
            }
            BuiltinMapper::HardcodedClaim => with_claim_targets(
                base("Hardcoded claim")
                    .property(PropertySpec::string("claim.name").required())
                    .property(PropertySpec::string("claim.value").required())
                    .property(PropertySpec::json_type()),
                None,
            ),
            BuiltinMapper::UserSessionNote => with_claim_targets(
                base("User Session Note")
                    .property(PropertySpec::string("user.session.note").required())
                    .property(PropertySpec::string("claim.name").required())
                    .property(PropertySpec::json_type()),
                None,
            ),
            BuiltinMapper::RoleName => base("Role Name Mapper")
                .property(PropertySpec::role("role").required())
                .property(PropertySpec::string("new.role.name").required()),
            BuiltinMapper::FullName => with_claim_targets(base("User's full name"), Some("true")),
            BuiltinMapper::UserAttribute => with_claim_targets(
                base("User Attribute")
                    .property(PropertySpec::string("user.attribute").required())
                    .property(PropertySpec::boolean("multivalued"))
                    .property(PropertySpec::string("claim.name"))
                    .property(PropertySpec::json_type()),
                None,
            ),
            BuiltinMapper::UserProperty => with_claim_targets(
                base("User Property")
                    .property(PropertySpec::string("user.attribute").required())
                    .property(PropertySpec::string("claim.name"))
                    .property(PropertySpec::json_type()),
                None,
            ),
            BuiltinMapper::GroupMembership => with_claim_targets(
                base("Group Membership")
                    .property(PropertySpec::boolean("full.path"))
                    .property(PropertySpec::string("claim.name").default_value("groups")),
                Some("true"),
            ),
            BuiltinMapper::RealmRole => base("User Realm Role")
                .property(PropertySpec::string("usermodel.realmRoleMapping.rolePrefix"))
                .property(PropertySpec::string("claim.name").default_value("realm_access.roles"))
                .property(PropertySpec::boolean("id.token.claim"))
                .property(PropertySpec::boolean("access.token.claim").default_value("true"))
                .property(PropertySpec::boolean("userinfo.token.claim")),
            BuiltinMapper::ClientRole => base("User Client Role")
                .property(PropertySpec::string("usermodel.clientRoleMapping.clientId"))
                .property(PropertySpec::string("usermodel.clientRoleMapping.rolePrefix"))
                .property(
                    PropertySpec::string("claim.name")
                        .default_value("resource_access.${client_id}.roles"),
                )
                .property(PropertySpec::boolean("id.token.claim"))
                .property(PropertySpec::boolean("access.token.claim").default_value("true"))
                .property(PropertySpec::boolean("userinfo.token.claim")),
            BuiltinMapper::Audience => base("Audience")
                .property(PropertySpec::string("included.client.audience"))
                .property(PropertySpec::string("included.custom.audience"))
                .property(PropertySpec::boolean("id.token.claim"))
                .property(PropertySpec::boolean("access.token.claim").default_value("true")),
        }
    }
}

fn with_claim_targets(
    descriptor: MapperTypeDescriptor,
    default: Option<&str>,
) -> MapperTypeDescriptor {
    ["id.token.claim", "access.token.claim", "userinfo.token.claim"]
        .into_iter()
        .fold(descriptor, |descriptor, key| {
            let spec = match default {
                Some(value) => PropertySpec::boolean(key).default_value(value),
                None => PropertySpec::boolean(key),
            };
            descriptor.property(spec)
        })
}

#[async_trait]
impl MapperTransform for BuiltinMapper {
    async fn transform(
        &self,
        config: &MapperConfig<'_>,
        ctx: &TransformContext<'_>,
    ) -> TransformResult<Vec<ClaimContribution>> {
        match self {
            BuiltinMapper::HardcodedRole => {
                let role = ctx.roles.parse_role(config.require("role")?)?;
                Ok(vec![role_contribution(&role)])
            }
            BuiltinMapper::HardcodedClaim => {
                let value = coerce(config.require("claim.value")?, config.json_type())?;
                config.emit(config.require("claim.name")?, value)
            }
            BuiltinMapper::UserSessionNote => {
                let note = ctx
                    .identity
                    .session_note(ctx.session, config.require("user.session.note")?)
                    .await?;
                match note {
                    Some(note) => {
                        let value = coerce(&note, config.json_type())?;
                        config.emit(config.require("claim.name")?, value)
                    }
                    None => Ok(Vec::new()),
                }
            }
            BuiltinMapper::RoleName => role_name(config, ctx).await,
            BuiltinMapper::FullName => full_name(config, ctx).await,
            BuiltinMapper::UserAttribute => {
                let attribute = config.require("user.attribute")?;
                let values = ctx.identity.user_attribute(ctx.principal, attribute).await?;
                let claim_name = config.get("claim.name").unwrap_or(attribute);
                let value = if config.flag("multivalued") {
                    if values.is_empty() {
                        return Ok(Vec::new());
                    }
                    let coerced = values
                        .iter()
                        .map(|value| coerce(value, config.json_type()))
                        .collect::<Result<Vec<_>, _>>()?;
                    Value::Array(coerced)
                } else {
                    match values.first() {
                        Some(first) => coerce(first, config.json_type())?,
                        None => return Ok(Vec::new()),
                    }
                };
                config.emit(claim_name, value)
            }
            BuiltinMapper::UserProperty => {
                let property = config.require("user.attribute")?;
                let Some(raw) = ctx.identity.user_property(ctx.principal, property).await? else {
                    return Ok(Vec::new());
                };
                let claim_name = config.get("claim.name").unwrap_or(property);
                config.emit(claim_name, coerce(&raw, config.json_type())?)
            }
            BuiltinMapper::GroupMembership => {
                let groups = ctx.identity.group_memberships(ctx.principal).await?;
                let full_path = config.flag("full.path");
                let names: Vec<Value> = groups
                    .iter()
                    .map(|group| {
                        let name = if full_path {
                            group.full_path()
                        } else {
                            group.name()
                        };
                        Value::String(name.to_string())
                    })
                    .collect();
                config.emit(config.require("claim.name")?, Value::Array(names))
            }
            BuiltinMapper::RealmRole => {
                let prefix = config
                    .get("usermodel.realmRoleMapping.rolePrefix")
                    .unwrap_or_default();
                let roles: Vec<Value> = ctx
                    .identity
                    .effective_roles(ctx.principal)
                    .await?
                    .into_iter()
                    .filter(|role| role.scope == RoleScope::Realm)
                    .map(|role| Value::String(format!("{prefix}{}", role.name)))
                    .collect();
                if roles.is_empty() {
                    return Ok(Vec::new());
                }
                let path = ClaimPath::parse(config.require("claim.name")?)?;
                Ok(config.emit_append(&path, Value::Array(roles)))
            }
            BuiltinMapper::ClientRole => client_roles(config, ctx).await,
            BuiltinMapper::Audience => {
                let audiences: Vec<Value> = [
                    config.get("included.client.audience"),
                    config.get("included.custom.audience"),
                ]
                .into_iter()
                .flatten()
                .map(|audience| Value::String(audience.to_string()))
                .collect();
                if audiences.is_empty() {
                    return Ok(Vec::new());
                }
                let path = ClaimPath::parse("aud")?;
                Ok(config.emit_append(&path, Value::Array(audiences)))
            }
        }
    }
}

fn role_contribution(role: &RoleRef) -> ClaimContribution {
    ClaimContribution::append(
        ClaimTarget::AccessToken,
        role.claim_path(),
        Value::String(role.name.clone()),
    )
}

async fn role_name(
    config: &MapperConfig<'_>,
    ctx: &TransformContext<'_>,
) -> TransformResult<Vec<ClaimContribution>> {
    let role = ctx.roles.parse_role(config.require("role")?)?;
    let effective = ctx.identity.effective_roles(ctx.principal).await?;
    if !effective.contains(&role) {
        return Ok(Vec::new());
    }
    let renamed = ctx.roles.parse_role(config.require("new.role.name")?)?;
    Ok(vec![ClaimContribution::rename(
        ClaimTarget::AccessToken,
        role.claim_path(),
        Value::String(role.name.clone()),
        renamed.claim_path(),
        Value::String(renamed.name.clone()),
    )])
}

async fn full_name(
    config: &MapperConfig<'_>,
    ctx: &TransformContext<'_>,
) -> TransformResult<Vec<ClaimContribution>> {
    let given = ctx.identity.user_property(ctx.principal, "firstName").await?;
    let family = ctx.identity.user_property(ctx.principal, "lastName").await?;
    let parts: Vec<&str> = [given.as_deref(), family.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    config.emit("name", Value::String(parts.join(" ")))
}

async fn client_roles(
    config: &MapperConfig<'_>,
    ctx: &TransformContext<'_>,
) -> TransformResult<Vec<ClaimContribution>> {
    let only_client = config.get("usermodel.clientRoleMapping.clientId");
    let prefix = config
        .get("usermodel.clientRoleMapping.rolePrefix")
        .unwrap_or_default();
    let mut by_client: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for role in ctx.identity.effective_roles(ctx.principal).await? {
        let Some(client_id) = role.client_id() else {
            continue;
        };
        if only_client.is_some_and(|only| only != client_id) {
            continue;
        }
        by_client
            .entry(client_id.to_string())
            .or_default()
            .push(Value::String(format!("{prefix}{}", role.name)));
    }

    let template = config.require("claim.name")?;
    let mut contributions = Vec::new();
    for (client_id, roles) in by_client {
        let claim_name = template.replace(CLIENT_ID_PLACEHOLDER, &client_id.replace('.', "\\."));
        let path = ClaimPath::parse(&claim_name)?;
        contributions.extend(config.emit_append(&path, Value::Array(roles)));
    }
    Ok(contributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MapperConfigMap;
    use crate::providers::memory::{InMemoryIdentityProvider, SessionRecord, UserRecord};
    use crate::providers::{Principal, UserSession};
    use crate::transform::TransformError;
    use mapper_claims::{ClaimError, ClaimOp};
    use serde_json::json;

    struct Fixture {
        provider: InMemoryIdentityProvider,
        principal: Principal,
        session: UserSession,
    }

    fn fixture() -> Fixture {
        let mut user = UserRecord::new("u1", "alice");
        user.first_name = Some("Alice".to_string());
        user.last_name = Some("Liddell".to_string());
        user.email = Some("alice@example.com".to_string());
        user.attributes.insert(
            "phone".to_string(),
            vec!["111".to_string(), "222".to_string()],
        );
        user.roles = vec![
            "offline_access".to_string(),
            "account.view-profile".to_string(),
            "my-app.reader".to_string(),
        ];
        user.groups = vec!["/engineering/platform".to_string(), "/admins".to_string()];
        let provider = InMemoryIdentityProvider::new()
            .with_realm_role("offline_access")
            .with_client_role("account", "view-profile")
            .with_client_role("my-app", "reader")
            .with_user(user.clone())
            .with_session(SessionRecord {
                id: "s1".to_string(),
                user_id: "u1".to_string(),
                notes: [("session note".to_string(), "42".to_string())].into(),
            });
        Fixture {
            principal: user.principal(),
            session: UserSession {
                session_id: "s1".to_string(),
                user_id: "u1".to_string(),
            },
            provider,
        }
    }

    async fn run(
        mapper: BuiltinMapper,
        values: &[(&str, &str)],
    ) -> TransformResult<Vec<ClaimContribution>> {
        let fixture = fixture();
        let descriptor = mapper.descriptor();
        let values: MapperConfigMap = values
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let config = MapperConfig::new(&descriptor, &values);
        let ctx = TransformContext {
            client_id: "app",
            principal: &fixture.principal,
            session: &fixture.session,
            identity: &fixture.provider,
            roles: &fixture.provider,
        };
        mapper.transform(&config, &ctx).await
    }

    #[tokio::test]
    async fn hardcoded_role_targets_role_claims() {
        let out = run(BuiltinMapper::HardcodedRole, &[("role", "offline_access")])
            .await
            .expect("realm");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, ClaimTarget::AccessToken);
        assert_eq!(out[0].path.to_string(), "realm_access.roles");
        assert_eq!(out[0].value, json!("offline_access"));

        let out = run(BuiltinMapper::HardcodedRole, &[("role", "account.view-profile")])
            .await
            .expect("client");
        assert_eq!(
            out[0].path.segments(),
            ["resource_access", "account", "roles"]
        );
        assert_eq!(out[0].value, json!("view-profile"));
    }

    #[tokio::test]
    async fn hardcoded_claim_gates_targets() {
        let out = run(
            BuiltinMapper::HardcodedClaim,
            &[
                ("claim.name", "tier"),
                ("claim.value", "5"),
                ("jsonType.label", "int"),
                ("id.token.claim", "true"),
                ("access.token.claim", "false"),
            ],
        )
        .await
        .expect("claim");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, ClaimTarget::IdToken);
        assert_eq!(out[0].value, json!(5));
        assert_eq!(out[0].op, ClaimOp::Set);
    }

    #[tokio::test]
    async fn hardcoded_claim_reports_coercion_failure() {
        let err = run(
            BuiltinMapper::HardcodedClaim,
            &[
                ("claim.name", "tier"),
                ("claim.value", "notanumber"),
                ("jsonType.label", "long"),
                ("id.token.claim", "true"),
            ],
        )
        .await
        .expect_err("coercion");
        assert!(matches!(
            err,
            TransformError::Claim(ClaimError::Coercion { .. })
        ));
    }

    #[tokio::test]
    async fn session_note_present_and_absent() {
        let out = run(
            BuiltinMapper::UserSessionNote,
            &[
                ("user.session.note", "session note"),
                ("claim.name", "claim name"),
                ("jsonType.label", "int"),
                ("access.token.claim", "true"),
            ],
        )
        .await
        .expect("note");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, json!(42));

        let out = run(
            BuiltinMapper::UserSessionNote,
            &[
                ("user.session.note", "missing"),
                ("claim.name", "claim name"),
                ("access.token.claim", "true"),
            ],
        )
        .await
        .expect("absent note");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn role_name_rewrites_only_held_roles() {
        let out = run(
            BuiltinMapper::RoleName,
            &[("role", "offline_access"), ("new.role.name", "new role")],
        )
        .await
        .expect("rename");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].op,
            ClaimOp::Rename {
                from: ClaimPath::parse("realm_access.roles").expect("path"),
                old: json!("offline_access"),
            }
        );
        assert_eq!(out[0].path.to_string(), "realm_access.roles");
        assert_eq!(out[0].value, json!("new role"));

        let out = run(
            BuiltinMapper::RoleName,
            &[("role", "account.manage"), ("new.role.name", "x")],
        )
        .await
        .expect("not held");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn full_name_defaults_to_all_targets() {
        let out = run(BuiltinMapper::FullName, &[]).await.expect("full name");
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|c| c.value == json!("Alice Liddell")));
        assert!(out.iter().all(|c| c.path.to_string() == "name"));
    }

    #[tokio::test]
    async fn user_attribute_single_and_multivalued() {
        let out = run(
            BuiltinMapper::UserAttribute,
            &[("user.attribute", "phone"), ("id.token.claim", "true")],
        )
        .await
        .expect("single");
        assert_eq!(out[0].path.to_string(), "phone");
        assert_eq!(out[0].value, json!("111"));

        let out = run(
            BuiltinMapper::UserAttribute,
            &[
                ("user.attribute", "phone"),
                ("multivalued", "true"),
                ("claim.name", "phones"),
                ("jsonType.label", "long"),
                ("id.token.claim", "true"),
            ],
        )
        .await
        .expect("multi");
        assert_eq!(out[0].path.to_string(), "phones");
        assert_eq!(out[0].value, json!([111, 222]));
    }

    #[tokio::test]
    async fn user_property_reads_bean_properties() {
        let out = run(
            BuiltinMapper::UserProperty,
            &[
                ("user.attribute", "email"),
                ("claim.name", "email"),
                ("userinfo.token.claim", "true"),
            ],
        )
        .await
        .expect("property");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, ClaimTarget::Userinfo);
        assert_eq!(out[0].value, json!("alice@example.com"));

        let out = run(
            BuiltinMapper::UserProperty,
            &[("user.attribute", "nickname"), ("id.token.claim", "true")],
        )
        .await
        .expect("absent");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn group_membership_paths() {
        let out = run(BuiltinMapper::GroupMembership, &[("full.path", "true")])
            .await
            .expect("full");
        assert_eq!(out[0].path.to_string(), "groups");
        assert_eq!(out[0].value, json!(["/engineering/platform", "/admins"]));

        let out = run(BuiltinMapper::GroupMembership, &[]).await.expect("leaf");
        assert_eq!(out[0].value, json!(["platform", "admins"]));
    }

    #[tokio::test]
    async fn realm_and_client_role_listings() {
        let out = run(
            BuiltinMapper::RealmRole,
            &[("usermodel.realmRoleMapping.rolePrefix", "realm:")],
        )
        .await
        .expect("realm roles");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, json!(["realm:offline_access"]));

        let out = run(BuiltinMapper::ClientRole, &[]).await.expect("client roles");
        let paths: Vec<String> = out.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(
            paths,
            [
                "resource_access.account.roles",
                "resource_access.my-app.roles"
            ]
        );

        let out = run(
            BuiltinMapper::ClientRole,
            &[("usermodel.clientRoleMapping.clientId", "account")],
        )
        .await
        .expect("filtered");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, json!(["view-profile"]));
    }

    #[tokio::test]
    async fn audience_appends_configured_values() {
        let out = run(
            BuiltinMapper::Audience,
            &[
                ("included.client.audience", "account"),
                ("included.custom.audience", "https://api.example.com"),
            ],
        )
        .await
        .expect("audience");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, ClaimTarget::AccessToken);
        assert_eq!(out[0].value, json!(["account", "https://api.example.com"]));

        assert!(run(BuiltinMapper::Audience, &[]).await.expect("none").is_empty());
    }

    #[test]
    fn descriptors_match_type_ids() {
        for mapper in BuiltinMapper::ALL {
            assert_eq!(mapper.descriptor().type_id, mapper.type_id());
        }
        let claim = BuiltinMapper::HardcodedClaim.descriptor();
        assert_eq!(
            claim.required_keys().collect::<Vec<_>>(),
            ["claim.name", "claim.value"]
        );
        assert!(BuiltinMapper::FullName.descriptor().required_keys().next().is_none());
    }
}
