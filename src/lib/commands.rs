use std::io::{self, Write};

use tracing::{info, warn};

use crate::{
    Error,
    api::{Action, AddOptions, Client, Modifier, RetrieveOptions},
    auth::Authorizer,
    browser::SystemBrowser,
    cli::{Cli, Command, ListArgs},
    config::Config,
    cull::{Cull, Policy},
    error::describe,
    probe::HttpProber,
    prompt::{Prompt, Terminal},
    store::{self, CredentialStore},
    template::Template,
};

/// Execute one parsed command line.
pub fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::from_cli(&cli)?;
    config.ensure_dir()?;
    let mut prompt = Terminal;
    let client = connect(&config, &mut prompt)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.subcommand {
        Command::List(args) => list(&config, &client, args, &mut prompt, &mut out),
        Command::Archive { item_id } => archive(&client, item_id, &mut out),
        Command::Delete { item_id } => delete(&client, item_id, &mut out),
        Command::Add { url, title, tags } => add(
            &client,
            &AddOptions {
                url: url.into(),
                title,
                tags,
            },
            &mut out,
        ),
    }
}

/// Build an authenticated client, authorizing first if there is no saved
/// access token.
pub fn connect(config: &Config, prompt: &mut dyn Prompt) -> Result<Client, Error> {
    let store = CredentialStore::new(config);
    let consumer_key = store.load_consumer_key(prompt)?;
    let authorizer = Authorizer::new(config.origin.as_str(), config.auth_timeout);
    let credential = match store.ensure_access_token(&consumer_key, |key| {
        authorizer.authorize(key, |url| {
            println!("Open this URL in a browser and approve access:\n{url}");
        })
    }) {
        Ok(credential) => credential,
        Err(e) => {
            if matches!(e, store::Error::Unsaved { .. }) {
                warn!("{}; using the new token for this run only", describe(&e));
            }
            e.into_credential()?
        }
    };
    Ok(Client::new(config.origin.as_str(), credential))
}

pub fn list(
    config: &Config,
    client: &Client,
    args: ListArgs,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let template = match args.format {
        Some(format) => Template::new(format)?,
        None => Template::default(),
    };
    let options = RetrieveOptions {
        domain: args.domain,
        search: args.search,
        tag: args.tag,
        sort: args.sort,
        ..Default::default()
    };
    let items = client.retrieve(&options)?.into_items();
    info!(count = items.len(), "retrieved items");

    let browser = SystemBrowser::new(config.browser.clone());
    let policy = Policy {
        delete_all: args.delete,
        probe: args.cull,
    };
    let report = Cull::new(client, &HttpProber, &browser, prompt, &template, out)
        .run(items, policy)?;
    info!(?report, "list finished");
    Ok(())
}

pub fn archive(client: &Client, item_id: u64, out: &mut dyn Write) -> Result<(), Error> {
    modify_one(client, Action::archive(item_id), "Archived", out)
}

pub fn delete(client: &Client, item_id: u64, out: &mut dyn Write) -> Result<(), Error> {
    modify_one(client, Action::delete(item_id), "Deleted", out)
}

fn modify_one(
    client: &Client,
    action: Action,
    done: &str,
    out: &mut dyn Write,
) -> Result<(), Error> {
    let item_id = action.item_id;
    let result = client.modify(&[action])?;
    if result.all_succeeded() {
        writeln!(out, "{done} item {item_id}")?;
    } else {
        warn!(item_id, "Pocket reported the action as failed");
        writeln!(out, "Pocket did not apply the change to item {item_id}")?;
    }
    Ok(())
}

pub fn add(client: &Client, options: &AddOptions, out: &mut dyn Write) -> Result<(), Error> {
    let result = client.add(options)?;
    match result.item {
        Some(item) => writeln!(out, "Added item {} <{}>", item.item_id, item.url())?,
        None => writeln!(out, "Added <{}>", options.url)?,
    }
    Ok(())
}
