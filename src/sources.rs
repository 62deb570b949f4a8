use anyhow::Result;

use crate::config::Config;

/// List configured sources and whether their inputs are reachable.
pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<12} {}", "SOURCE", "STATUS");

    match &config.sources.blog {
        Some(blog) if blog.root.exists() => println!("{:<12} OK ({})", "blog", blog.root.display()),
        Some(blog) => println!("{:<12} MISSING ROOT ({})", "blog", blog.root.display()),
        None => println!("{:<12} NOT CONFIGURED", "blog"),
    }

    match &config.sources.youtube {
        Some(yt) if yt.root.exists() => println!("{:<12} OK ({})", "youtube", yt.root.display()),
        Some(yt) => println!("{:<12} MISSING ROOT ({})", "youtube", yt.root.display()),
        None => println!("{:<12} NOT CONFIGURED", "youtube"),
    }

    match &config.sources.forum {
        Some(forum) if forum.db_path.exists() => {
            println!("{:<12} OK ({})", "forum_qa", forum.db_path.display());
            println!("{:<12} OK ({})", "forum_raw", forum.db_path.display());
        }
        Some(forum) => {
            println!("{:<12} MISSING DB ({})", "forum_qa", forum.db_path.display());
            println!("{:<12} MISSING DB ({})", "forum_raw", forum.db_path.display());
        }
        None => {
            println!("{:<12} NOT CONFIGURED", "forum_qa");
            println!("{:<12} NOT CONFIGURED", "forum_raw");
        }
    }

    // Facts live in this store's own database
    println!("{:<12} OK (built-in)", "fact");

    Ok(())
}
