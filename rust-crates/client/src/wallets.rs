use alloy::signers::local::{
    MnemonicBuilder,
    PrivateKeySigner,
    coins_bip39::English,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

/// Keystores are stored either bare (`cast wallet import`) or as `.json`.
fn is_keystore_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        None => true,
        Some(ext) => ext.eq_ignore_ascii_case("json"),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() || !is_keystore_file(&path) {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        if name.starts_with('.') {
            continue;
        }
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy()))
}

/// Builds a signer from decrypted keystore material: a raw 32-byte key or a
/// BIP-39 phrase derived at the first account.
pub fn signer_from_secret(name: &str, secret: &[u8]) -> Result<PrivateKeySigner> {
    if secret.len() == 32 {
        if let Ok(signer) = PrivateKeySigner::from_slice(secret) {
            return Ok(signer);
        }
    }

    if let Ok(mnemonic) = std::str::from_utf8(secret) {
        let word_count = mnemonic.split_whitespace().count();
        if word_count >= 12 {
            let signer = MnemonicBuilder::<English>::default()
                .phrase(mnemonic.trim())
                .index(0)
                .wrap_err("Invalid derivation index")?
                .build()
                .wrap_err_with(|| format!("Invalid mnemonic in wallet '{name}'"))?;
            return Ok(signer);
        }
    }

    Err(eyre!("Wallet '{name}' contained unsupported key material"))
}

pub fn decrypt_keystore(
    descriptor: &WalletDescriptor,
    password: &str,
) -> Result<PrivateKeySigner> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;
    signer_from_secret(&descriptor.name, &secret)
}

pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<PrivateKeySigner> {
    let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read wallet password")?;
    decrypt_keystore(descriptor, &password)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::address;
    use tempdir::TempDir;

    const ANVIL_MNEMONIC: &str =
        "test test test test test test test test test test test junk";

    #[test]
    fn list_wallets__returns_sorted_keystores_only() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(dir.path().join("zeta"), b"{}").unwrap();
        fs::write(dir.path().join("alpha.json"), b"{}").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        // when
        let wallets = list_wallets(dir.path()).unwrap();

        // then
        let names: Vec<_> = wallets.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn list_wallets__missing_directory_is_empty() {
        // given
        let dir = TempDir::new("keystores").unwrap();

        // when
        let wallets = list_wallets(&dir.path().join("absent")).unwrap();

        // then
        assert!(wallets.is_empty());
    }

    #[test]
    fn find_wallet__reports_unknown_names() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(dir.path().join("player"), b"{}").unwrap();

        // when
        let found = find_wallet(dir.path(), "player").unwrap();
        let missing = find_wallet(dir.path(), "nobody");

        // then
        assert_eq!(found.path, dir.path().join("player"));
        assert!(missing.unwrap_err().to_string().contains("Wallet 'nobody' not found"));
    }

    #[test]
    fn resolve_wallet_dir__keeps_explicit_paths() {
        assert_eq!(
            resolve_wallet_dir(Some("/tmp/keys")).unwrap(),
            PathBuf::from("/tmp/keys")
        );
    }

    #[test]
    fn signer_from_secret__derives_first_account_from_mnemonic() {
        // when
        let signer = signer_from_secret("dev", ANVIL_MNEMONIC.as_bytes()).unwrap();

        // then
        assert_eq!(
            signer.address(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn signer_from_secret__accepts_raw_private_key() {
        // given
        let key = [0x42u8; 32];

        // when
        let signer = signer_from_secret("raw", &key).unwrap();

        // then
        assert_eq!(signer.address(), PrivateKeySigner::from_slice(&key).unwrap().address());
    }

    #[test]
    fn signer_from_secret__rejects_other_material() {
        assert!(signer_from_secret("junk", b"not a key").is_err());
    }
}
