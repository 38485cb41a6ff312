use eyre::{Context, Result};
use tokio::io::BufReader;

use typesql::backend::new_backend;
use typesql::cli::{Action, Command, Repl, actions};
use typesql::config::{Configuration, init_logger, verbose};
use typesql::session::SessionContext;
use typesql::storage::new_storage;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return Ok(());
    }

    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    Configuration::init(cmd.get_config()?)?;
    let config = Configuration::instance();

    init_logger(&config.log)?;
    verbose!("[+] Logger initialized");

    verbose!("[+] Initializing storage...");
    let storage = new_storage(&config.storage)
        .await
        .wrap_err("initializing storage")?;
    verbose!("[+] Storage initialized");

    let mut stdout = tokio::io::stdout();
    let action = cmd.action().cloned().unwrap_or_default();
    match action {
        Action::Sessions => actions::list_sessions(&storage, &mut stdout).await?,
        Action::History { session_id } => {
            actions::print_history(&storage, &session_id, &mut stdout).await?
        }
        Action::Delete { session_id } => {
            actions::delete_session(&storage, &session_id, &mut stdout).await?
        }
        Action::Purge => actions::purge(&storage, &mut stdout).await?,
        Action::Diagram {
            schema_file,
            output,
        } => actions::render_diagram(&schema_file, output.as_deref(), &mut stdout).await?,
        Action::Chat {
            session,
            name,
            schema,
        } => {
            verbose!("[+] Initializing backend...");
            let backend = new_backend(&config.backend).wrap_err("initializing backend")?;
            verbose!("[+] Using model {}", config.backend.model);

            let mut ctx = SessionContext::new(storage, backend, &config.backend.model);
            if let Some(id) = session {
                ctx.switch(&id).await?;
            }
            if let Some(name) = name {
                ctx.create(&name)?;
            }
            if let Some(path) = schema {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .wrap_err(format!("reading schema file {}", path))?;
                ctx.upload_schema(text).await;
                verbose!("[+] Schema uploaded from {}", path);
            }

            let mut repl = Repl::new(ctx);
            repl.run(BufReader::new(tokio::io::stdin()), &mut stdout)
                .await?;
        }
    }

    Ok(())
}
