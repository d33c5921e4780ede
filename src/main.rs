use clap::{arg,crate_version,Command};
use compactor::{analysis,huffman,lz77,rle};

const RCH: &str = "unreachable was reached";

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();
    let long_help =
"Examples:
---------
Compress:      `compactor compress -m lz77 -i report.txt -o report.lz77`
Expand:        `compactor expand -m lz77 -i report.lz77 -o report.txt`
Analyze:       `compactor analyze -m rle -i scan.bmp`";

    let methods = ["huffman","rle","lz77"];

    let mut main_cmd = Command::new("compactor")
        .about("Compress, expand, and analyze with classic codecs")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(methods)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(--threshold [COUNT] "minimum run length (rle)")
            .value_parser(clap::value_parser!(usize)))
        .arg(arg!(--window [BYTES] "window size (lz77)")
            .value_parser(clap::value_parser!(usize)))
        .arg(arg!(--lookahead [BYTES] "lookahead size (lz77)")
            .value_parser(clap::value_parser!(usize)))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(methods)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand a file"));

    main_cmd = main_cmd.subcommand(Command::new("analyze")
        .arg(arg!(-m --method <METHOD> "compression algorithm").value_parser(methods)
            .required(true))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(--threshold [COUNT] "minimum run length (rle)")
            .value_parser(clap::value_parser!(usize)))
        .arg(arg!(--window [BYTES] "window size (lz77)")
            .value_parser(clap::value_parser!(usize)))
        .arg(arg!(--lookahead [BYTES] "lookahead size (lz77)")
            .value_parser(clap::value_parser!(usize)))
        .about("predict how well a codec will do on a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        match method.as_str() {
            "huffman" => {
                let stats = huffman::compress_file(path_in,path_out)?;
                report_sizes(stats.original_size,stats.compressed_size,stats.compression_ratio,stats.space_saved_percent);
                println!("symbols:           {}",stats.symbol_count);
                println!("code lengths:      {} to {} bits, mean {:.2}",stats.min_code_length,stats.max_code_length,stats.mean_code_length);
            },
            "rle" => {
                let threshold = *cmd.get_one::<usize>("threshold").unwrap_or(&rle::DEFAULT_THRESHOLD);
                let stats = rle::compress_file(path_in,path_out,threshold)?;
                report_sizes(stats.original_size,stats.compressed_size,stats.compression_ratio,stats.space_saved_percent);
                println!("runs:              {}",stats.run_segments);
                println!("literal segments:  {}",stats.literal_segments);
            },
            "lz77" => {
                let params = lz77_params(cmd)?;
                let stats = lz77::compress_file(path_in,path_out,&params)?;
                report_sizes(stats.original_size,stats.compressed_size,stats.compression_ratio,stats.space_saved_percent);
                println!("triplets:          {}",stats.triplet_count);
                println!("matches:           {} (mean length {:.2})",stats.match_count,stats.average_match_length);
            },
            _ => {
                eprintln!("{} not supported",method);
                return Err(Box::new(std::fmt::Error));
            }
        }
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        match method.as_str() {
            "huffman" => {
                let stats = huffman::expand_file(path_in,path_out)?;
                println!("expanded {} symbols into {} bytes",stats.symbols_decoded,stats.expanded_size);
            },
            "rle" => {
                let stats = rle::expand_file(path_in,path_out)?;
                println!("expanded {} runs and {} literals into {} bytes",stats.runs_processed,stats.literals_processed,stats.expanded_size);
            },
            "lz77" => {
                let stats = lz77::expand_file(path_in,path_out)?;
                println!("expanded {} triplets into {} bytes",stats.triplets_processed,stats.expanded_size);
            },
            _ => {
                eprintln!("{} not supported",method);
                return Err(Box::new(std::fmt::Error));
            }
        }
    }

    if let Some(cmd) = matches.subcommand_matches("analyze") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        match method.as_str() {
            "huffman" => {
                let ana = huffman::analyze_file(path_in)?;
                println!("file size:         {}",ana.file_size);
                println!("unique bytes:      {}",ana.unique_bytes);
                println!("entropy:           {:.2} bits/byte",ana.entropy);
                println!("predicted saving:  {:.1}%",ana.predicted_space_saved_percent);
                report_top_bytes(&ana.top_bytes,ana.file_size);
                println!("recommendation:    {}",ana.recommendation);
            },
            "rle" => {
                let threshold = *cmd.get_one::<usize>("threshold").unwrap_or(&rle::DEFAULT_THRESHOLD);
                let ana = rle::analyze_file(path_in,threshold)?;
                println!("file size:         {}",ana.file_size);
                println!("unique bytes:      {}",ana.unique_bytes);
                for (len,count) in ana.run_distribution.iter().enumerate() {
                    if *count > 0 {
                        println!("runs of {:2}:        {}",len + 2,count);
                    }
                }
                if ana.long_runs > 0 {
                    println!("runs of 11+:       {}",ana.long_runs);
                }
                println!("compressible:      {} bytes ({:.1}%)",ana.compressible_bytes,ana.compressible_fraction * 100.0);
                report_top_bytes(&ana.top_bytes,ana.file_size);
                println!("recommendation:    {}",ana.recommendation);
            },
            "lz77" => {
                let params = lz77_params(cmd)?;
                let ana = lz77::analyze_file(path_in,&params)?;
                println!("file size:         {}",ana.file_size);
                println!("sample analyzed:   {}",ana.sample_size);
                println!("entropy:           {:.2} bits/byte",ana.entropy);
                println!("matches found:     {} ({:.1}% of sample)",ana.matches_found,ana.match_ratio * 100.0);
                println!("match lengths:     mean {:.2}, longest {}",ana.average_match_length,ana.longest_match);
                println!("estimated ratio:   {:.2}",ana.estimated_compression_ratio);
                for hit in &ana.patterns {
                    let readable: String = hit.pattern.iter().map(|b| analysis::display_byte(*b)).collect();
                    println!("pattern {:20} x{} (~{} bytes saved)",readable,hit.occurrences,hit.bytes_saved);
                }
                report_top_bytes(&ana.top_bytes,ana.file_size);
                println!("recommendation:    {}",ana.recommendation);
            },
            _ => {
                eprintln!("{} not supported",method);
                return Err(Box::new(std::fmt::Error));
            }
        }
    }

    Ok(())
}

fn lz77_params(cmd: &clap::ArgMatches) -> Result<lz77::Params,compactor::Error> {
    let window = *cmd.get_one::<usize>("window").unwrap_or(&lz77::DEFAULT_WINDOW);
    let lookahead = *cmd.get_one::<usize>("lookahead").unwrap_or(&lz77::DEFAULT_LOOKAHEAD);
    lz77::Params::new(window,lookahead)
}

fn report_sizes(original: usize,compressed: usize,ratio: f64,saved: f64) {
    println!("original size:     {}",original);
    println!("compressed size:   {}",compressed);
    println!("compression ratio: {:.3}",ratio);
    println!("space saved:       {:.1}%",saved);
}

fn report_top_bytes(top: &[(u8,u64)],total: usize) {
    for (val,count) in top {
        println!("byte {:4}:         {} ({:.1}%)",analysis::display_byte(*val),count,*count as f64 / total as f64 * 100.0);
    }
}
