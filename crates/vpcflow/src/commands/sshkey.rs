use super::Context;
use anyhow::Context as _;
use colored::Colorize;
use std::path::Path;
use vpcflow_cloud::{
    ActionType, Plan, Resource, ResourceAddress, ResourceData, StateFile, plan_change,
};
use vpcflow_cloud_ibm::ssh_key::RESOURCE_TYPE;
use vpcflow_cloud_ibm::{PROVIDER_NAME, SshKey};

/// Public key from the flag, or from a file
pub fn read_public_key(inline: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    let key = match (inline, file) {
        (Some(key), _) => key,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read public key from {}", path.display()))?,
        (None, None) => anyhow::bail!("--public-key or --public-key-file is required"),
    };

    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("Public key is empty");
    }
    Ok(key)
}

/// State address of a key; the label stays fixed when the key is renamed
fn address(label: &str) -> ResourceAddress {
    ResourceAddress::new(PROVIDER_NAME, RESOURCE_TYPE, label)
}

/// Re-read a stored key; drops it from state when it is gone remotely
async fn refresh(
    ctx: &Context,
    state: &mut StateFile,
    address: &ResourceAddress,
) -> anyhow::Result<Option<ResourceData<SshKey>>> {
    let Some(stored) = state.get(address) else {
        return Ok(None);
    };

    let mut data: ResourceData<SshKey> = stored.to_data()?;
    ctx.provider.ssh_key().read(&mut data, &ctx.session).await?;

    if data.is_absent() {
        println!(
            "{} {} no longer exists, removing it from state",
            "!".yellow(),
            address
        );
        state.forget(address);
        return Ok(None);
    }
    Ok(Some(data))
}

pub async fn apply(
    ctx: &Context,
    label: &str,
    name: &str,
    public_key: &str,
    resource_group: Option<String>,
) -> anyhow::Result<()> {
    let resource = ctx.provider.ssh_key();
    let address = address(label);
    let mut state = ctx.state.read().await?;

    let mut desired = SshKey::new(name, public_key);
    let default_group = Some(ctx.config.resource_group.clone()).filter(|g| !g.is_empty());
    if let Some(group) = resource_group.or(default_group) {
        desired = desired.with_resource_group(group);
    }

    let prior = refresh(ctx, &mut state, &address).await?;
    let plan = plan_change(
        resource.type_name(),
        resource.schema(),
        prior.as_ref().map(|d| d.attrs()),
        &desired,
    )?;
    println!("{} {} {}", "Plan:".bold(), name.cyan(), plan);

    let data = match prior {
        None => {
            let mut data = ResourceData::new(desired);
            resource.create(&mut data, &ctx.session).await?;
            data
        }
        Some(current) => match plan.action_type {
            ActionType::NoOp => current,
            ActionType::Update => {
                let mut data =
                    ResourceData::existing(current.id(), desired).with_changes(&plan.changed);
                resource.update(&mut data, &ctx.session).await?;
                data
            }
            // Replace: the old key goes first so the name is free again
            _ => {
                let mut old = current;
                resource.delete(&mut old, &ctx.session).await?;
                state.forget(&address);

                let mut data = ResourceData::new(desired);
                resource.create(&mut data, &ctx.session).await?;
                data
            }
        },
    };

    if data.is_absent() {
        state.forget(&address);
        ctx.state.write(&state).await?;
        anyhow::bail!("SSH key {} disappeared right after apply", label);
    }

    state.put(&address, &data)?;
    ctx.state.write(&state).await?;

    if plan.has_changes() {
        println!(
            "{} {} {} ({})",
            "✓".green(),
            plan.action_type,
            name.cyan(),
            data.id()
        );
    } else {
        println!("{} {} is up to date", "✓".green(), name.cyan());
    }
    Ok(())
}

/// Record an existing remote key under `label`, or under its remote name
pub async fn import(ctx: &Context, id: &str, label: Option<&str>) -> anyhow::Result<()> {
    let data = ctx.provider.ssh_key().import(id, &ctx.session).await?;
    let label = label.unwrap_or(&data.attrs().name).to_string();
    let address = address(&label);

    let mut state = ctx.state.read().await?;
    if let Some(stored) = state.get(&address).filter(|stored| stored.id != id) {
        anyhow::bail!(
            "{} already tracks SSH key {}; destroy it or pick another --label",
            address,
            stored.id
        );
    }

    state.put(&address, &data)?;
    ctx.state.write(&state).await?;
    println!("{} imported {} as {}", "✓".green(), id, label.cyan());
    Ok(())
}

pub async fn show(ctx: &Context, label: &str) -> anyhow::Result<()> {
    let address = address(label);
    let mut state = ctx.state.read().await?;
    if state.get(&address).is_none() {
        anyhow::bail!("SSH key {} is not managed in {}", label, ctx.state.path().display());
    }

    let Some(data) = refresh(ctx, &mut state, &address).await? else {
        ctx.state.write(&state).await?;
        return Ok(());
    };

    state.put(&address, &data)?;
    ctx.state.write(&state).await?;

    let mut attributes = serde_json::to_value(data.attrs())?;
    if let Some(object) = attributes.as_object_mut() {
        object.insert("id".to_string(), serde_json::Value::String(data.id().to_string()));
    }
    println!("{}", serde_json::to_string_pretty(&attributes)?);
    Ok(())
}

pub async fn exists(ctx: &Context, label: &str) -> anyhow::Result<()> {
    let state = ctx.state.read().await?;
    let exists = match state.get(&address(label)) {
        Some(stored) => {
            let data: ResourceData<SshKey> = stored.to_data()?;
            ctx.provider.ssh_key().exists(&data, &ctx.session).await?
        }
        None => false,
    };
    println!("{}", exists);
    Ok(())
}

pub async fn destroy(ctx: &Context, label: &str) -> anyhow::Result<()> {
    let resource = ctx.provider.ssh_key();
    let address = address(label);
    let mut state = ctx.state.read().await?;
    let Some(stored) = state.get(&address) else {
        println!("{}", format!("SSH key {} is not managed, nothing to destroy", label).dimmed());
        return Ok(());
    };

    let plan = Plan::delete(resource.type_name());
    println!("{} {} {}", "Plan:".bold(), label.cyan(), plan);

    let mut data: ResourceData<SshKey> = stored.to_data()?;
    let id = data.id().to_string();
    resource.delete(&mut data, &ctx.session).await?;

    state.forget(&address);
    ctx.state.write(&state).await?;
    println!("{} destroyed {} ({})", "✓".green(), label.cyan(), id);
    Ok(())
}
