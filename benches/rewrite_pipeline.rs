use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use playlist_proxy::fetch::LineSplitter;
use playlist_proxy::playlist::{RewriteContext, rewrite_lines};
use std::fmt::Write;

/// IPTV-style playlist with a header directive before every other channel.
fn build_playlist(channels: usize) -> String {
    let mut playlist = String::with_capacity(channels * 160);
    let _ = writeln!(playlist, "#EXTM3U");
    for i in 0..channels {
        let _ = writeln!(
            playlist,
            "#EXTINF:-1 tvg-id=\"ch{i}\" group-title=\"Group {}\",Channel {i}",
            i % 10
        );
        if i % 2 == 0 {
            let _ = writeln!(playlist, "#EXTVLCOPT:http-user-agent=Mozilla/5.0 (X11)");
            let _ = writeln!(playlist, "#EXTVLCOPT:http-referrer=https://site.example/");
        }
        match i % 4 {
            0 => {
                let _ = writeln!(playlist, "https://cdn.example.com/live/{i}/index.m3u8");
            }
            1 => {
                let _ = writeln!(playlist, "https://cdn.example.com/dash/{i}.mpd");
            }
            2 => {
                let _ = writeln!(playlist, "https://dl.example.com/stream/stream-{i}.php");
            }
            _ => {
                let _ = writeln!(playlist, "http://cdn.example.com/vod/{i}.mp4");
            }
        }
    }
    playlist
}

fn bench_rewrite(c: &mut Criterion) {
    let playlist = build_playlist(5_000);
    let context = RewriteContext::new("https://mfp.example.com", Some("secret".to_string()));

    let mut group = c.benchmark_group("rewrite");
    group.throughput(Throughput::Bytes(playlist.len() as u64));

    group.bench_function("rewrite_lines_5000_channels", |b| {
        b.iter(|| {
            let bytes: usize = rewrite_lines(playlist.split_inclusive('\n'), context.clone())
                .map(|line| line.len())
                .sum();
            black_box(bytes)
        })
    });

    group.bench_function("split_and_rewrite_16k_chunks", |b| {
        b.iter(|| {
            let mut splitter = LineSplitter::default();
            let mut lines = Vec::new();
            for chunk in playlist.as_bytes().chunks(16 * 1024) {
                lines.extend(splitter.push(chunk));
            }
            lines.extend(splitter.finish());
            let count = rewrite_lines(lines, context.clone()).count();
            black_box(count)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_rewrite);
criterion_main!(benches);
