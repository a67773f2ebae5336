use tempshot_core::CATALOG;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(CATALOG)?);
        return Ok(());
    }
    for option in CATALOG {
        if option.is_keep_forever() {
            println!("{:<6} keep forever", option.label);
        } else {
            println!("{:<6} {} min", option.label, option.minutes);
        }
    }
    Ok(())
}
