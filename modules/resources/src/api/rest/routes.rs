use std::sync::Arc;

use api_ingress::{OperationBuilder, OperationTableBuilder, ParamKind, RouteTableError};
use gateway_errors::FailureKind;

use crate::api::rest::handlers::{HandlerCtx, ResourceHandler, Shape};
use crate::contract::{HostAction, ResourceKind};

/// Kinds with the full create / list / inspect / delete set.
const MANAGED: [ResourceKind; 7] = [
    ResourceKind::Host,
    ResourceKind::Volume,
    ResourceKind::Cluster,
    ResourceKind::SecurityGroup,
    ResourceKind::Network,
    ResourceKind::Subnet,
    ResourceKind::Bucket,
];

fn tag(kind: ResourceKind) -> &'static str {
    kind.plural()
}

/// Register every v1 operation into `table`.
pub fn register_routes(
    table: &mut OperationTableBuilder,
    ctx: Arc<HandlerCtx>,
) -> Result<(), RouteTableError> {
    let h = |shape: Shape| ResourceHandler::new(shape, ctx.clone());

    // Tenants
    OperationBuilder::get("/v1/tenants")
        .operation_id("tenants.list")
        .summary("List tenants")
        .tag(tag(ResourceKind::Tenant))
        .handler(h(Shape::List(ResourceKind::Tenant)))
        .collection_response(200, "TenantList", "Known tenants")
        .register(table)?;

    OperationBuilder::get("/v1/tenant")
        .operation_id("tenant.current")
        .summary("Get the current tenant")
        .tag(tag(ResourceKind::Tenant))
        .handler(h(Shape::CurrentTenant))
        .json_response(200, "Tenant", "Current tenant")
        .register(table)?;

    OperationBuilder::post("/v1/tenant")
        .operation_id("tenant.set_current")
        .summary("Select the current tenant")
        .tag(tag(ResourceKind::Tenant))
        .query_param("name", ParamKind::String, true, "Tenant to switch to")
        .fails_with(FailureKind::NotFound)
        .handler(h(Shape::SelectTenant))
        .json_response(200, "Tenant", "The newly selected tenant")
        .register(table)?;

    for kind in MANAGED {
        let plural = kind.plural();
        let single = kind.as_str();
        let Some(request) = kind.request_schema() else {
            continue;
        };

        let mut list = OperationBuilder::get(format!("/v1/{plural}"))
            .operation_id(format!("{plural}.list"))
            .summary(format!("List {plural}"))
            .tag(tag(kind))
            .query_param("all", ParamKind::Boolean, false, "Include resources not created through the gateway");
        if kind == ResourceKind::Host {
            list = list.query_param("tenant_id", ParamKind::String, false, "Tenant to list for");
        }
        list.handler(h(Shape::List(kind)))
            .collection_response(200, kind.list_schema(), format!("List of {plural}"))
            .register(table)?;

        let mut create = OperationBuilder::post(format!("/v1/{single}"))
            .operation_id(format!("{single}.create"))
            .summary(format!("Create a {single}"))
            .tag(tag(kind))
            .json_request(request, format!("{single} to create"))
            .fails_with(FailureKind::Conflict)
            .fails_with(FailureKind::Unauthorized);
        if kind == ResourceKind::Subnet {
            create = create.fails_with(FailureKind::NotFound);
        }
        create
            .handler(h(Shape::Create(kind)))
            .json_response(200, kind.schema(), format!("The created {single}"))
            .register(table)?;

        OperationBuilder::get(format!("/v1/{single}/{{id}}"))
            .operation_id(format!("{single}.inspect"))
            .summary(format!("Inspect a {single}"))
            .tag(tag(kind))
            .path_param("id", format!("{single} id or name"))
            .fails_with(FailureKind::NotFound)
            .handler(h(Shape::Inspect(kind)))
            .json_response(200, kind.schema(), format!("The {single}"))
            .register(table)?;

        let mut delete = OperationBuilder::delete(format!("/v1/{single}/{{id}}"))
            .operation_id(format!("{single}.delete"))
            .summary(format!("Delete a {single}"))
            .tag(tag(kind))
            .path_param("id", format!("{single} id or name"));
        if kind == ResourceKind::Host {
            delete = delete
                .query_param("tenant_id", ParamKind::String, false, "Tenant owning the host")
                .query_param("name", ParamKind::String, false, "Host name, when the id is unknown");
        }
        delete
            .fails_with(FailureKind::NotFound)
            .handler(h(Shape::Delete(kind)))
            .empty_response(200, format!("The {single} was deleted"))
            .register(table)?;
    }

    // Host specifics
    for action in HostAction::ALL {
        OperationBuilder::post(format!("/v1/host/{{id}}/{action}"))
            .operation_id(format!("host.{action}"))
            .summary(format!("{action} a host"))
            .tag(tag(ResourceKind::Host))
            .path_param("id", "host id or name")
            .fails_with(FailureKind::NotFound)
            .handler(h(Shape::HostAction(action)))
            .json_response(200, "Host", "The host after the action")
            .register(table)?;
    }

    OperationBuilder::get("/v1/host/{id}/ssh")
        .operation_id("host.ssh")
        .summary("Ssh connection parameters of a host")
        .tag(tag(ResourceKind::Host))
        .path_param("id", "host id or name")
        .fails_with(FailureKind::NotFound)
        .handler(h(Shape::HostSsh))
        .json_response(200, "SshConfig", "Ssh configuration")
        .register(table)?;

    OperationBuilder::get("/v1/host/{id}/security_groups")
        .operation_id("host.security_groups")
        .summary("Security groups bound to a host")
        .tag(tag(ResourceKind::Host))
        .path_param("id", "host id or name")
        .fails_with(FailureKind::NotFound)
        .handler(h(Shape::HostSecurityGroups))
        .collection_response(200, "SecurityGroupList", "Bound security groups")
        .register(table)?;

    // Images
    OperationBuilder::get("/v1/images")
        .operation_id("images.list")
        .summary("List images")
        .tag(tag(ResourceKind::Image))
        .query_param("all", ParamKind::Boolean, false, "Include every image the provider offers")
        .handler(h(Shape::List(ResourceKind::Image)))
        .collection_response(200, "ImageList", "Available images")
        .register(table)?;

    OperationBuilder::get("/v1/image/{id}")
        .operation_id("image.inspect")
        .summary("Inspect an image")
        .tag(tag(ResourceKind::Image))
        .path_param("id", "image id or name")
        .fails_with(FailureKind::NotFound)
        .handler(h(Shape::Inspect(ResourceKind::Image)))
        .json_response(200, "Image", "The image")
        .register(table)?;

    Ok(())
}
