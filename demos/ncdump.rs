use clap::Parser;
use tracing_subscriber::EnvFilter;

use netcdf_async::{DimensionLength, Group};

/// Print the header of a netcdf file
#[derive(Debug, Parser)]
struct Opt {
    path: std::path::PathBuf,
    /// Also print the values of every variable
    #[arg(short, long)]
    values: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let opt = Opt::parse();

    match run(&opt).await {
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

async fn run(opt: &Opt) -> Result<(), Box<dyn std::error::Error>> {
    let file = netcdf_async::open(&opt.path, "r", None).await?;
    println!("{} ({})", file.name(), file.format());

    let mut pending = vec![file.root().ok_or("file closed while opening")?];
    while let Some(g) = pending.pop() {
        print_group(&g, opt.values).await?;
        let mut subgroups: Vec<_> = g.get_subgroups().await?.into_iter().collect();
        subgroups.sort_by(|a, b| b.0.cmp(&a.0));
        pending.extend(subgroups.into_iter().map(|(_, g)| g));
    }
    file.close().await?;
    Ok(())
}

async fn print_group(g: &Group, values: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Group: {}", g.get_path().await?);

    println!("Dimensions:");
    let mut dims: Vec<_> = g.get_dimensions(false).await?.into_iter().collect();
    dims.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, len) in dims {
        match len {
            DimensionLength::Unlimited => {
                let len = g.get_dimension(&name).await?.get_length().await?;
                println!("\t{name} : Unlimited ({len})");
            }
            DimensionLength::Fixed(len) => println!("\t{name} : ({len})"),
        }
    }

    println!("Variables:");
    let mut vars: Vec<_> = g.get_variables().await?.into_iter().collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, v) in vars {
        let dims = v.get_dimensions().await?;
        let shape: Vec<_> = dims.iter().map(|(d, _)| d.as_str()).collect();
        println!("\t{} {name}({})", v.get_type(), shape.join(", "));

        let mut atts: Vec<_> = v.get_attribute_values().await?.into_iter().collect();
        atts.sort_by(|a, b| a.0.cmp(&b.0));
        for (a, value) in atts {
            println!("\t\t{a} = {value}");
        }

        let count: Vec<usize> = dims.iter().map(|&(_, len)| len).collect();
        if values && count.iter().all(|&n| n > 0) {
            let start = vec![0_usize; count.len()];
            println!("\t\tdata = {:?}", v.read_slice(start, count).await?);
        }
    }

    println!("Attributes:");
    let mut atts: Vec<_> = g.get_attribute_values().await?.into_iter().collect();
    atts.sort_by(|a, b| a.0.cmp(&b.0));
    for (a, value) in atts {
        println!("\t{a} = {value}");
    }
    Ok(())
}
