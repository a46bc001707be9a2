use clap::Parser;
use commute_sync::utils::error::ErrorSeverity;
use commute_sync::utils::logger;
use commute_sync::{
    channel, fetch_address_durations, CliConfig, Command, CommuteAddress, DurationsCache,
    EventBus, FileStorageArea, HttpDurationsProvider, MaxDurations, MemoryPageStorage,
    PageBridge, StorageFacade, StorageGateway, SyncConfig, SyncError, TravelMode,
};
use std::sync::Arc;

fn exit_code(e: &SyncError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn print_status(addresses: &[CommuteAddress], max: &MaxDurations) {
    println!("📍 Commute addresses ({}):", addresses.len());
    for address in addresses {
        let label = address
            .fields
            .get("address")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        println!("  {} {}", address.id, label);
    }

    println!("⏱  Max durations:");
    for mode in TravelMode::ALL {
        match max.get(mode) {
            Some(minutes) => println!("  {:<8} {} min", mode, minutes),
            None => println!("  {:<8} no limit", mode),
        }
    }
}

async fn run(command: &Command, config: &SyncConfig) -> commute_sync::Result<()> {
    // 特權端：檔案儲存區 + 通勤時間 API
    let provider = HttpDurationsProvider::new(config.api.base_url.clone(), config.timeout())?;
    let gateway = Arc::new(StorageGateway::new(
        FileStorageArea::new(&config.storage.path),
        Arc::new(provider),
    ));
    let (transport, requests) = channel();
    let changes = gateway.subscribe();
    let server = {
        let gateway = gateway.clone();
        tokio::spawn(async move { gateway.serve(requests).await })
    };

    // 頁面端：記憶體儲存 + 橋接
    let events = Arc::new(EventBus::new());
    events.subscribe(|event| {
        tracing::debug!(event = event.name(), "page event received");
        Ok(())
    });
    let bridge = Arc::new(PageBridge::new(
        Arc::new(MemoryPageStorage::new()),
        transport.clone(),
        events.clone(),
    ));
    bridge.start(changes).await;
    let facade = StorageFacade::page(bridge.clone());

    match command {
        Command::Status => {}
        Command::AddAddress { id, address } => {
            let mut addresses = facade.get_commute_addresses();
            addresses.retain(|existing| existing.id != *id);
            addresses.push(CommuteAddress::new(id.clone(), address.clone()));
            facade.save_commute_addresses(addresses);
        }
        Command::RemoveAddress { id } => {
            let mut addresses = facade.get_commute_addresses();
            let before = addresses.len();
            addresses.retain(|existing| existing.id != *id);
            if addresses.len() == before {
                tracing::warn!("No address with id {}", id);
            } else {
                facade.save_commute_addresses(addresses);
            }
        }
        Command::SetMax { mode, minutes } => {
            let mut max = facade.get_max_durations();
            max.set(*mode, *minutes);
            facade.save_max_durations(max);
        }
        Command::Clear => facade.clear_addresses().await?,
        Command::Durations => {
            let cache = Arc::new(DurationsCache::new());
            let subscription = cache.attach(&events);
            let response = fetch_address_durations(&transport, facade.get_commute_addresses()).await;

            match response.data {
                Some(address_durations) => {
                    cache.replace(address_durations.clone());
                    for entry in &address_durations {
                        println!(
                            "🚶 {} walking {:?} / biking {:?} / driving {:?} / transit {:?}",
                            entry.address.id,
                            entry.durations.walking,
                            entry.durations.biking,
                            entry.durations.driving,
                            entry.durations.transit
                        );
                    }
                    for (id, mode) in cache.exceeding(&facade.get_max_durations()) {
                        println!("⚠️  {} exceeds the {} limit", id, mode);
                    }
                }
                None => eprintln!(
                    "❌ {}",
                    response.error.as_deref().unwrap_or("Failed to load commute times")
                ),
            }
            events.unsubscribe(subscription);
        }
    }

    // 等待所有轉送完成後，直接讀取閘道的權威值
    facade.flush().await?;
    let (addresses, max) = gateway.snapshot().await?;
    print_status(&addresses, &max);

    bridge.stop();
    server.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(exit_code(&e));
        }
    };

    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("Starting commute-sync");
    tracing::debug!("Config: {:?}", config);

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!("❌ commute-sync failed: {} (Severity: {:?})", e, e.severity());
        eprintln!("❌ {}", e);

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
