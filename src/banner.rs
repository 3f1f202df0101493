// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
             _        _                    
  __ _ _   _| |_ ___ | |_ _   _ _ __   ___ 
 / _` | | | | __/ _ \| __| | | | '_ \ / _ \
| (_| | |_| | || (_) | |_| |_| | | | |  __/
 \__,_|\__,_|\__\___/ \__|\__,_|_| |_|\___|

    Sandboxed Parameter Search Service
"#;
    println!("{}", banner);
}
