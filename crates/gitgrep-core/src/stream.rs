//! 流式行解码器（裸文本 + zlib/gzip 透明解压）
//!
//! 约定：
//! - 通过前 2 个魔数字节判定编码形态；探测后无条件回退到文件头，
//!   真正的读取从偏移 0 开始。
//! - 压缩流按 64 KiB 粒度增量 inflate，逐步切分出完整行；
//!   流结束时若残留末尾片段（无换行符收尾）则作为最后一行产出。
//! - 解码一律采用有损策略：非法字节序列替换为占位符，绝不因此报错。

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::{MultiGzDecoder, ZlibDecoder};

/// 读缓冲大小（字节）。压缩流按该粒度喂入 inflate 上下文。
const CHUNK_SIZE: usize = 1 << 16; // 64 KiB

/// 文件编码形态（由魔数判定一次，单文件内不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    Raw,
    Zlib,
    Gzip,
}

/// 探测文件编码：读取前 2 字节并精确比对四种魔数，随后回退到文件头。
/// 不足 2 字节或魔数不识别均按裸文本处理。
pub(crate) fn detect_encoding(f: &mut File) -> io::Result<Encoding> {
    let mut magic = [0u8; 2];
    let n = read_up_to(f, &mut magic)?;
    f.seek(SeekFrom::Start(0))?;
    if n < 2 {
        return Ok(Encoding::Raw);
    }
    Ok(match magic {
        [0x1f, 0x8b] => Encoding::Gzip,
        [0x78, 0x9c] | [0x78, 0x01] | [0x78, 0xda] => Encoding::Zlib,
        _ => Encoding::Raw,
    })
}

/// 尽量填满 buf：EOF 前反复 read，返回实际读到的字节数
fn read_up_to(f: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match f.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// 单个文件上的惰性行序列：有限、单向、不可重放。
/// 行号由消费方从 1 开始编号，解码器本身不感知行号。
pub struct LineReader {
    inner: BufReader<Box<dyn Read>>,
    done: bool,
}

impl LineReader {
    /// 打开文件并按探测到的编码构造行序列
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let enc = detect_encoding(&mut file)?;
        let src: Box<dyn Read> = match enc {
            Encoding::Raw => Box::new(file),
            Encoding::Zlib => Box::new(ZlibDecoder::new(BufReader::with_capacity(CHUNK_SIZE, file))),
            Encoding::Gzip => Box::new(MultiGzDecoder::new(BufReader::with_capacity(CHUNK_SIZE, file))),
        };
        Ok(Self {
            inner: BufReader::with_capacity(CHUNK_SIZE, src),
            done: false,
        })
    }
}

impl Iterator for LineReader {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut raw = Vec::new();
        match self.inner.read_until(b'\n', &mut raw) {
            // 以换行收尾的文件不会多出一个空的末行
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if raw.last() == Some(&b'\n') {
                    raw.pop();
                }
                // 有损解码后裁掉行尾空白（含 \r）
                let text = String::from_utf8_lossy(&raw);
                Some(Ok(text.trim_end().to_string()))
            }
            // 读取/解压失败：产出一次错误后终止本文件的序列
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
